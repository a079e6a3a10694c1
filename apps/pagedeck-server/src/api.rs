//! API handlers for the pagedeck server
//!
//! Provides the upload form, a health check, and the six page operations:
//! reverse, delete-last-2, delete-N, delete-specific, add-images, merge.
//!
//! Every operation spools its uploads into a per-request scratch directory,
//! runs the PDF work on the blocking pool, writes the single result file,
//! and streams it back as an attachment with a fixed filename.

use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::scratch::RequestScratch;
use pagedeck_core::Location;

const INDEX_HTML: &str = include_str!("index.html");

/// Handler: GET /
pub async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pagedeck-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /reverse
pub async fn handle_reverse(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let upload = form.take_file("pdf_file")?;

    info!(
        "Reverse request: file={}, {} bytes",
        upload.filename,
        upload.bytes.len()
    );

    let output = run_single(upload, "reversed.pdf", |bytes| {
        Ok(pagedeck_core::reverse_pages(bytes)?)
    })
    .await?;

    Ok(attachment("reversed.pdf", output))
}

/// Handler: POST /delete_last_2
pub async fn handle_delete_last_two(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let upload = form.take_file("pdf_file")?;

    info!("Delete-last-2 request: file={}", upload.filename);

    let output = run_single(upload, "deleted_last2.pdf", |bytes| {
        Ok(pagedeck_core::delete_last_two(bytes)?)
    })
    .await?;

    Ok(attachment("deleted_last2.pdf", output))
}

/// Handler: POST /delete_n
pub async fn handle_delete_n(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart).await?;

    let count: usize = form.value("n")?.trim().parse().map_err(|_| {
        ApiError::InvalidInput("Field 'n' must be a non-negative integer".into())
    })?;
    let location = parse_location(form.value("location")?)?;
    let upload = form.take_file("pdf_file")?;

    info!(
        "Delete-n request: file={}, n={}, location={:?}",
        upload.filename, count, location
    );

    let output = run_single(upload, "deleted_n.pdf", move |bytes| {
        Ok(pagedeck_core::delete_count(bytes, count, location)?)
    })
    .await?;

    Ok(attachment("deleted_n.pdf", output))
}

/// Handler: POST /delete_specific
pub async fn handle_delete_specific(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart).await?;

    let pages = pagedeck_core::parse_page_list(form.value("pages")?)?;
    let upload = form.take_file("pdf_file")?;

    info!(
        "Delete-specific request: file={}, pages={:?}",
        upload.filename, pages
    );

    let output = run_single(upload, "deleted_specific.pdf", move |bytes| {
        Ok(pagedeck_core::delete_listed(bytes, &pages)?)
    })
    .await?;

    Ok(attachment("deleted_specific.pdf", output))
}

/// Handler: POST /add_images
pub async fn handle_add_images(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart).await?;

    let location = parse_location(form.value("location")?)?;
    let pdf = form.take_file("pdf_file")?;
    let images = form.take_files("images");

    info!(
        "Add-images request: file={}, {} images, location={:?}",
        pdf.filename,
        images.len(),
        location
    );

    let output = run_blocking(move || {
        let scratch = RequestScratch::new()?;
        let pdf_path = scratch.spool(&pdf.filename, &pdf.bytes)?;
        let pdf_bytes = std::fs::read(&pdf_path)?;

        // Each image becomes its own one-page A4 document
        let mut image_docs = Vec::with_capacity(images.len());
        for (idx, img) in images.iter().enumerate() {
            let img_path =
                scratch.spool(&format!("img_{}_{}", idx, img.filename), &img.bytes)?;
            let img_bytes = std::fs::read(&img_path)?;
            image_docs.push(pagedeck_core::image_to_pdf(&img_bytes)?);
        }

        let mut sources = Vec::with_capacity(image_docs.len() + 1);
        match location {
            Location::Start => {
                sources.extend(image_docs);
                sources.push(pdf_bytes);
            }
            Location::End => {
                sources.push(pdf_bytes);
                sources.extend(image_docs);
            }
        }

        let result = pagedeck_core::merge_documents(sources)?;
        std::fs::write(scratch.output_path("added_images.pdf"), &result)?;
        Ok(result)
    })
    .await?;

    Ok(attachment("added_images.pdf", output))
}

/// Handler: POST /merge
pub async fn handle_merge(multipart: Multipart) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart).await?;

    let uploads = form.take_files("pdf_files");
    if uploads.is_empty() {
        return Err(ApiError::InvalidInput(
            "At least one file is required in 'pdf_files'".into(),
        ));
    }

    info!("Merge request: {} files", uploads.len());

    let output = run_blocking(move || {
        let scratch = RequestScratch::new()?;

        // Spool, then read back in upload order
        let mut sources = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            let path = scratch.spool(&upload.filename, &upload.bytes)?;
            sources.push(std::fs::read(&path)?);
        }

        let result = pagedeck_core::merge_documents(sources)?;
        std::fs::write(scratch.output_path("merged.pdf"), &result)?;
        Ok(result)
    })
    .await?;

    Ok(attachment("merged.pdf", output))
}

/// One uploaded file from a multipart form
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Collected multipart form: file parts and plain-text values
#[derive(Default)]
struct FormData {
    files: Vec<(String, UploadedFile)>,
    values: Vec<(String, String)>,
}

impl FormData {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            ApiError::InvalidInput(format!("Failed to read multipart field: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            if let Some(filename) = field.file_name() {
                let filename = filename.to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::InvalidInput(format!("Failed to read uploaded file: {}", e))
                })?;
                form.files.push((
                    name,
                    UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    },
                ));
            } else {
                let text = field.text().await.map_err(|e| {
                    ApiError::InvalidInput(format!("Failed to read form field: {}", e))
                })?;
                form.values.push((name, text));
            }
        }

        Ok(form)
    }

    fn value(&self, name: &str) -> Result<&str, ApiError> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| ApiError::InvalidInput(format!("Missing form field '{}'", name)))
    }

    fn take_file(&mut self, name: &str) -> Result<UploadedFile, ApiError> {
        let pos = self
            .files
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| ApiError::InvalidInput(format!("Missing file field '{}'", name)))?;

        let upload = self.files.remove(pos).1;
        if upload.bytes.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "File field '{}' is empty",
                name
            )));
        }
        Ok(upload)
    }

    fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.files.len() {
            if self.files[i].0 == name {
                taken.push(self.files.remove(i).1);
            } else {
                i += 1;
            }
        }
        taken
    }
}

fn parse_location(value: &str) -> Result<Location, ApiError> {
    match value.trim().to_lowercase().as_str() {
        "start" => Ok(Location::Start),
        "end" => Ok(Location::End),
        other => Err(ApiError::InvalidInput(format!(
            "Field 'location' must be 'start' or 'end', got '{}'",
            other
        ))),
    }
}

/// Spool a single upload, run `op` over its bytes on the blocking pool, and
/// leave the result file in the request's scratch directory.
async fn run_single<F>(
    upload: UploadedFile,
    output_name: &'static str,
    op: F,
) -> Result<Vec<u8>, ApiError>
where
    F: FnOnce(&[u8]) -> Result<Vec<u8>, ApiError> + Send + 'static,
{
    run_blocking(move || {
        let scratch = RequestScratch::new()?;
        let input_path = scratch.spool(&upload.filename, &upload.bytes)?;
        let bytes = std::fs::read(&input_path)?;

        let result = op(&bytes)?;

        std::fs::write(scratch.output_path(output_name), &result)?;
        Ok(result)
    })
    .await
}

/// lopdf parsing is CPU-bound; keep it off the async runtime.
async fn run_blocking<F>(task: F) -> Result<Vec<u8>, ApiError>
where
    F: FnOnce() -> Result<Vec<u8>, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("PDF task failed: {}", e)))?
}

fn attachment(filename: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}
