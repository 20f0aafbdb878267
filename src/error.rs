//! Error types for the PDF inspector server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::document::{DocumentError, ErrorKind};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Unknown route
    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

fn document_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::DocumentNotFound | ErrorKind::PageNotFound | ErrorKind::ObjectNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorKind::DocumentParseError | ErrorKind::DecodeError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
    }
}

fn internal(error: &dyn std::fmt::Display) -> (StatusCode, String, String) {
    tracing::error!("Internal error: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "InternalError".to_string(),
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::Document(e) => match e.kind() {
                Some(kind) => (document_status(kind), kind.to_string(), e.to_string()),
                None => internal(e),
            },
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound".to_string(), msg.clone()),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorKind::InvalidRequest.to_string(),
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict".to_string(), msg.clone()),
            AppError::Io(e) => internal(e),
            AppError::Internal(msg) => internal(msg),
        };

        let body = Json(ErrorResponse {
            error: error_type,
            message,
        });

        (status, body).into_response()
    }
}
