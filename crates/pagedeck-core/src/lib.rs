//! PDF page manipulation engine
//!
//! This crate provides the page-level transformations behind the pagedeck
//! server, built on lopdf:
//!
//! - `reverse_pages`: reverse the page order of a document
//! - `delete_count` / `delete_last_two`: drop N pages from either end
//! - `delete_listed`: drop specific 1-based pages
//! - `merge_documents`: concatenate documents in upload order
//! - `image_to_pdf`: rasterize a JPEG/PNG into a single full-page A4 page
//!
//! All operations take and return raw PDF bytes; callers own the I/O.

pub mod error;
pub mod image;
pub mod merge;
pub mod select;

pub use error::PdfOpError;
pub use image::{image_to_pdf, A4_HEIGHT, A4_WIDTH};
pub use merge::merge_documents;
pub use select::{delete_count, delete_last_two, delete_listed, reverse_pages, Location};

use lopdf::Document;

pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, PdfOpError> {
    Document::load_mem(bytes).map_err(|e| PdfOpError::ParseError(e.to_string()))
}

pub(crate) fn save_document(mut doc: Document) -> Result<Vec<u8>, PdfOpError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfOpError::OperationError(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Parse PDF bytes and return page count
pub fn page_count(bytes: &[u8]) -> Result<u32, PdfOpError> {
    Ok(load_document(bytes)?.get_pages().len() as u32)
}

/// Parse a comma-separated list of 1-based page numbers like "2, 4, 7"
/// into sorted unique page numbers.
///
/// Empty tokens (trailing commas, doubled commas) are skipped; anything
/// else that is not a positive integer is an error.
pub fn parse_page_list(input: &str) -> Result<Vec<u32>, PdfOpError> {
    use std::collections::BTreeSet;

    let mut pages = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let page: u32 = token.parse().map_err(|_| {
            PdfOpError::InvalidPageList(format!("Invalid page number: '{}'", token))
        })?;

        if page == 0 {
            return Err(PdfOpError::InvalidPageList(
                "Page numbers must be >= 1".into(),
            ));
        }

        pages.insert(page);
    }

    Ok(pages.into_iter().collect())
}
