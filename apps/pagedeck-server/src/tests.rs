//! Route-level tests for the pagedeck server
//!
//! These drive the real router with hand-built multipart bodies through
//! tower's `oneshot`, then parse the returned PDF to check page content and
//! order.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use crate::app;

const BOUNDARY: &str = "pagedeck-test-boundary";

struct Part {
    name: &'static str,
    filename: Option<&'static str>,
    data: Vec<u8>,
}

fn file_part(name: &'static str, filename: &'static str, data: Vec<u8>) -> Part {
    Part {
        name,
        filename: Some(filename),
        data,
    }
}

fn text_part(name: &'static str, value: &str) -> Part {
    Part {
        name,
        filename: None,
        data: value.as_bytes().to_vec(),
    }
}

fn multipart_body(parts: Vec<Part>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

struct TestResponse {
    status: StatusCode,
    disposition: Option<String>,
    body: Vec<u8>,
}

async fn post_multipart(uri: &str, parts: Vec<Part>) -> TestResponse {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();

    send(request).await
}

async fn send(request: Request<Body>) -> TestResponse {
    let response = app(64 * 1024 * 1024).oneshot(request).await.unwrap();
    let status = response.status();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();
    TestResponse {
        status,
        disposition,
        body,
    }
}

fn error_code(body: &[u8]) -> String {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    value["code"].as_str().unwrap().to_string()
}

// Build a simple PDF with N pages, each marked "<prefix> i"
fn create_test_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("{} {}", prefix, i + 1).into_bytes(),
                        lopdf::StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

// Extract the page markers from the document, in page order
fn page_markers(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            match (text.find('('), text.find(')')) {
                (Some(start), Some(end)) => text[start + 1..end].to_string(),
                _ => String::new(),
            }
        })
        .collect()
}

fn test_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 120, 240]));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    let html = String::from_utf8(response.body).unwrap();
    assert!(html.contains("<form"));
    assert!(html.contains("/merge"));
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(value["status"], "healthy");
}

#[tokio::test]
async fn test_reverse_returns_reversed_pages() {
    let pdf = create_test_pdf(3, "Page");
    let response = post_multipart("/reverse", vec![file_part("pdf_file", "in.pdf", pdf)]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.disposition.as_deref(),
        Some("attachment; filename=\"reversed.pdf\"")
    );
    assert_eq!(
        page_markers(&response.body),
        vec!["Page 3", "Page 2", "Page 1"]
    );
}

#[tokio::test]
async fn test_reverse_missing_file_is_invalid_input() {
    let response = post_multipart("/reverse", vec![]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_reverse_rejects_garbage_pdf() {
    let response = post_multipart(
        "/reverse",
        vec![file_part("pdf_file", "junk.pdf", b"not a pdf".to_vec())],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&response.body), "UNPARSABLE_PDF");
}

#[tokio::test]
async fn test_delete_last_two() {
    let pdf = create_test_pdf(5, "Page");
    let response =
        post_multipart("/delete_last_2", vec![file_part("pdf_file", "in.pdf", pdf)]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.disposition.as_deref(),
        Some("attachment; filename=\"deleted_last2.pdf\"")
    );
    assert_eq!(
        page_markers(&response.body),
        vec!["Page 1", "Page 2", "Page 3"]
    );
}

#[tokio::test]
async fn test_delete_last_two_single_page_clamps_to_empty() {
    let pdf = create_test_pdf(1, "Page");
    let response =
        post_multipart("/delete_last_2", vec![file_part("pdf_file", "in.pdf", pdf)]).await;

    assert_eq!(response.status, StatusCode::OK);
    let doc = Document::load_mem(&response.body).unwrap();
    assert_eq!(doc.get_pages().len(), 0);
}

#[tokio::test]
async fn test_delete_n_from_start() {
    let pdf = create_test_pdf(5, "Page");
    let response = post_multipart(
        "/delete_n",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("n", "2"),
            text_part("location", "start"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        page_markers(&response.body),
        vec!["Page 3", "Page 4", "Page 5"]
    );
}

#[tokio::test]
async fn test_delete_n_from_end() {
    let pdf = create_test_pdf(5, "Page");
    let response = post_multipart(
        "/delete_n",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("n", "1"),
            text_part("location", "end"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        page_markers(&response.body),
        vec!["Page 1", "Page 2", "Page 3", "Page 4"]
    );
}

#[tokio::test]
async fn test_delete_n_past_total_yields_empty_document() {
    let pdf = create_test_pdf(2, "Page");
    let response = post_multipart(
        "/delete_n",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("n", "99"),
            text_part("location", "end"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let doc = Document::load_mem(&response.body).unwrap();
    assert_eq!(doc.get_pages().len(), 0);
}

#[tokio::test]
async fn test_delete_n_missing_count_is_invalid_input() {
    let pdf = create_test_pdf(2, "Page");
    let response = post_multipart(
        "/delete_n",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("location", "end"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_delete_n_bad_location_is_invalid_input() {
    let pdf = create_test_pdf(2, "Page");
    let response = post_multipart(
        "/delete_n",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("n", "1"),
            text_part("location", "middle"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_delete_specific_pages() {
    let pdf = create_test_pdf(5, "Page");
    let response = post_multipart(
        "/delete_specific",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("pages", "2,4"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.disposition.as_deref(),
        Some("attachment; filename=\"deleted_specific.pdf\"")
    );
    assert_eq!(
        page_markers(&response.body),
        vec!["Page 1", "Page 3", "Page 5"]
    );
}

#[tokio::test]
async fn test_delete_specific_non_numeric_token_is_invalid_input() {
    let pdf = create_test_pdf(5, "Page");
    let response = post_multipart(
        "/delete_specific",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("pages", "2,x,4"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_delete_specific_out_of_range_page() {
    let pdf = create_test_pdf(3, "Page");
    let response = post_multipart(
        "/delete_specific",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            text_part("pages", "99"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&response.body), "PAGE_OUT_OF_RANGE");
}

#[tokio::test]
async fn test_merge_concatenates_in_upload_order() {
    let doc_a = create_test_pdf(2, "DocA");
    let doc_b = create_test_pdf(3, "DocB");

    let response = post_multipart(
        "/merge",
        vec![
            file_part("pdf_files", "a.pdf", doc_a),
            file_part("pdf_files", "b.pdf", doc_b),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.disposition.as_deref(),
        Some("attachment; filename=\"merged.pdf\"")
    );
    assert_eq!(
        page_markers(&response.body),
        vec!["DocA 1", "DocA 2", "DocB 1", "DocB 2", "DocB 3"]
    );
}

#[tokio::test]
async fn test_merge_single_document_round_trips() {
    let pdf = create_test_pdf(2, "Solo");
    let response =
        post_multipart("/merge", vec![file_part("pdf_files", "solo.pdf", pdf.clone())]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, pdf);
}

#[tokio::test]
async fn test_merge_single_corrupt_file_is_unparsable() {
    let response = post_multipart(
        "/merge",
        vec![file_part("pdf_files", "junk.pdf", b"not a pdf".to_vec())],
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&response.body), "UNPARSABLE_PDF");
}

#[tokio::test]
async fn test_merge_without_files_is_invalid_input() {
    let response = post_multipart("/merge", vec![]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.body), "INVALID_INPUT");
}

#[tokio::test]
async fn test_add_images_at_start() {
    let pdf = create_test_pdf(2, "Page");
    let response = post_multipart(
        "/add_images",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            file_part("images", "photo.png", test_png()),
            text_part("location", "start"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.disposition.as_deref(),
        Some("attachment; filename=\"added_images.pdf\"")
    );

    let doc = Document::load_mem(&response.body).unwrap();
    let pages: Vec<_> = doc.get_pages().values().copied().collect();
    assert_eq!(pages.len(), 3);

    // The first page is the rasterized image: A4-sized, drawing Im1
    let first = doc.get_object(pages[0]).unwrap().as_dict().unwrap();
    let media_box = first.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_f32().unwrap();
    assert!((width - pagedeck_core::A4_WIDTH).abs() < 0.01);

    let content = doc.get_page_content(pages[0]).unwrap();
    assert!(String::from_utf8_lossy(&content).contains("/Im1 Do"));
}

#[tokio::test]
async fn test_add_images_at_end() {
    let pdf = create_test_pdf(2, "Page");
    let response = post_multipart(
        "/add_images",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            file_part("images", "photo.png", test_png()),
            text_part("location", "end"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);

    let doc = Document::load_mem(&response.body).unwrap();
    let pages: Vec<_> = doc.get_pages().values().copied().collect();
    assert_eq!(pages.len(), 3);

    // Original pages first, image page last
    let markers = page_markers(&response.body);
    assert_eq!(markers[0], "Page 1");
    assert_eq!(markers[1], "Page 2");

    let content = doc.get_page_content(pages[2]).unwrap();
    assert!(String::from_utf8_lossy(&content).contains("/Im1 Do"));
}

#[tokio::test]
async fn test_add_images_rejects_non_image_upload() {
    let pdf = create_test_pdf(1, "Page");
    let response = post_multipart(
        "/add_images",
        vec![
            file_part("pdf_file", "in.pdf", pdf),
            file_part("images", "notes.txt", b"plain text".to_vec()),
            text_part("location", "end"),
        ],
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&response.body), "UNSUPPORTED_IMAGE");
}
