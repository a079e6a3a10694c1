//! Image to PDF conversion
//!
//! Converts an uploaded JPEG or PNG into a single-page PDF sized to A4,
//! with the image stretched to the full page and anchored at the origin.
//! Aspect ratio is not preserved and nothing is cropped.
//!
//! JPEG data is embedded as-is with a DCTDecode filter; PNG data is decoded,
//! alpha is blended over white, and the raw pixels are re-encoded with
//! FlateDecode.

use crate::error::PdfOpError;
use crate::save_document;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Write;

/// A4 page size in PDF points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// Image XObject ready for PDF embedding
struct ImageXObject {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
}

impl ImageXObject {
    fn into_stream(self) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(self.width as i64));
        dict.set("Height", Object::Integer(self.height as i64));
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        Stream::new(dict, self.data)
    }
}

/// Convert a JPEG or PNG image into a one-page A4 PDF.
pub fn image_to_pdf(data: &[u8]) -> Result<Vec<u8>, PdfOpError> {
    let xobject = decode_image(data)?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(xobject.into_stream());

    // Stretch the image over the whole page, origin at the bottom-left
    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im1 Do\nQ\n", A4_WIDTH, A4_HEIGHT);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut xobjects = Dictionary::new();
    xobjects.set("Im1", Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(A4_WIDTH),
            Object::Real(A4_HEIGHT),
        ]),
    );
    page.set("Contents", Object::Reference(content_id));
    page.set("Resources", Object::Dictionary(resources));
    let page_id = doc.add_object(page);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    save_document(doc)
}

fn decode_image(data: &[u8]) -> Result<ImageXObject, PdfOpError> {
    if is_jpeg(data) {
        from_jpeg(data)
    } else if is_png(data) {
        from_png(data)
    } else {
        Err(PdfOpError::ImageError(
            "Unsupported image format (JPEG or PNG required)".into(),
        ))
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 8 && data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
}

struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Scan JPEG markers for a SOF segment to get dimensions and component count
fn jpeg_info(data: &[u8]) -> Result<JpegInfo, PdfOpError> {
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF0..SOF15 excluding DHT/JPG/DAC
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        if i + 4 < data.len() {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            if length < 2 {
                break;
            }
            i += 2 + length;
        } else {
            break;
        }
    }

    Err(PdfOpError::ImageError(
        "Could not parse JPEG header".into(),
    ))
}

/// JPEG embeds directly: the compressed scan data is the stream content.
fn from_jpeg(data: &[u8]) -> Result<ImageXObject, PdfOpError> {
    let info = jpeg_info(data)?;

    let color_space = if info.num_components == 1 {
        "DeviceGray"
    } else {
        "DeviceRGB"
    };

    Ok(ImageXObject {
        width: info.width,
        height: info.height,
        color_space,
        filter: "DCTDecode",
        data: data.to_vec(),
    })
}

/// PNG is decoded to raw pixels; alpha channels are blended over white.
fn from_png(data: &[u8]) -> Result<ImageXObject, PdfOpError> {
    let img = image::load_from_memory(data).map_err(|e| PdfOpError::ImageError(e.to_string()))?;
    let (width, height) = (img.width(), img.height());

    let (raw, color_space) = match img.color() {
        image::ColorType::L8 | image::ColorType::L16 => {
            (img.to_luma8().into_raw(), "DeviceGray")
        }
        image::ColorType::La8 | image::ColorType::La16 => {
            let la = img.to_luma_alpha8();
            let mut gray = Vec::with_capacity((width * height) as usize);
            for pixel in la.pixels() {
                let alpha = pixel[1] as f32 / 255.0;
                gray.push((pixel[0] as f32 * alpha + 255.0 * (1.0 - alpha)) as u8);
            }
            (gray, "DeviceGray")
        }
        image::ColorType::Rgba8 | image::ColorType::Rgba16 => {
            let rgba = img.to_rgba8();
            let mut rgb = Vec::with_capacity((width * height * 3) as usize);
            for pixel in rgba.pixels() {
                let alpha = pixel[3] as f32 / 255.0;
                for channel in 0..3 {
                    rgb.push((pixel[channel] as f32 * alpha + 255.0 * (1.0 - alpha)) as u8);
                }
            }
            (rgb, "DeviceRGB")
        }
        _ => (img.to_rgb8().into_raw(), "DeviceRGB"),
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .map_err(|e| PdfOpError::ImageError(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| PdfOpError::ImageError(e.to_string()))?;

    Ok(ImageXObject {
        width,
        height,
        color_space,
        filter: "FlateDecode",
        data: compressed,
    })
}
