// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Comprehensive error enum for all possible failures
/// Each variant maps to appropriate HTTP status code and error response
#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Image not found with id: {0}")]
    #[allow(dead_code)]
    NotFound(i64),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Download error: {0}")]
    #[allow(dead_code)]
    DownloadError(String),

    #[error("Populate job is already running")]
    JobAlreadyRunning,

    #[error("Upload exceeds the configured size limit")]
    #[allow(dead_code)]
    PayloadTooLarge,

    #[error("Internal server error")]
    #[allow(dead_code)]
    InternalError,
}

/// Convert GalleryError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
impl ResponseError for GalleryError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = match self {
            GalleryError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GalleryError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            GalleryError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            GalleryError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            GalleryError::DownloadError(_) => (StatusCode::BAD_GATEWAY, "DOWNLOAD_ERROR"),
            GalleryError::JobAlreadyRunning => (StatusCode::CONFLICT, "JOB_ALREADY_RUNNING"),
            GalleryError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            GalleryError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GalleryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GalleryError::ValidationError(_) => StatusCode::BAD_REQUEST,
            GalleryError::DownloadError(_) => StatusCode::BAD_GATEWAY,
            GalleryError::JobAlreadyRunning => StatusCode::CONFLICT,
            GalleryError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GalleryError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
