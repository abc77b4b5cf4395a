//! HTTP-facing error type

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::page_range::PageRangeError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidRange(#[from] PageRangeError),

    #[error("{0}")]
    UnsupportedFile(String),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Could not process document: {0:#}")]
    Processing(#[from] anyhow::Error),

    #[error("OCR is not available: {0}")]
    OcrUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidRange(_) => "invalid_range_expression",
            AppError::UnsupportedFile(_) => "unsupported_file",
            AppError::Multipart(_) => "malformed_upload",
            AppError::Processing(_) => "processing_failed",
            AppError::OcrUnavailable(_) => "ocr_unavailable",
            AppError::Io(_) => "io_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::InvalidRange(_)
            | AppError::UnsupportedFile(_)
            | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Processing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "Request failed");
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(error = %self, code = self.code(), "Request rejected");
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.code(),
            message,
        });

        (status, body).into_response()
    }
}
