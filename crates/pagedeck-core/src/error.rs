use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfOpError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Page {page} does not exist (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    #[error("Invalid page list: {0}")]
    InvalidPageList(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),
}
