//! Error types for the pagedeck server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pagedeck_core::PdfOpError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Unparsable PDF: {0}")]
    UnparsablePdf(String),

    #[error("Page out of range: {0}")]
    PageOutOfRange(String),

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            ApiError::UnparsablePdf(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPARSABLE_PDF",
                msg.clone(),
            ),
            ApiError::PageOutOfRange(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PAGE_OUT_OF_RANGE",
                msg.clone(),
            ),
            ApiError::UnsupportedImage(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNSUPPORTED_IMAGE",
                msg.clone(),
            ),
            ApiError::Io(e) => {
                tracing::error!("Scratch space I/O failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_FAILURE",
                    "Scratch space I/O failure".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PdfOpError> for ApiError {
    fn from(err: PdfOpError) -> Self {
        match err {
            PdfOpError::ParseError(msg) => ApiError::UnparsablePdf(msg),
            PdfOpError::PageOutOfRange { page, total } => ApiError::PageOutOfRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, total
            )),
            PdfOpError::InvalidPageList(msg) => ApiError::InvalidInput(msg),
            PdfOpError::ImageError(msg) => ApiError::UnsupportedImage(msg),
            PdfOpError::OperationError(msg) => ApiError::Internal(msg),
        }
    }
}
