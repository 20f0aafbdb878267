//! Document error types
//!
//! Failures of the resolution pipeline. Every variant that a client can
//! cause maps onto an `ErrorKind`; the rest are server-side faults.

use serde::Serialize;
use thiserror::Error;

use crate::pdf::PdfError;

/// Enumerable failure categories reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DocumentNotFound,
    DocumentParseError,
    PageNotFound,
    ObjectNotFound,
    DecodeError,
    InvalidRequest,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DocumentNotFound => "DocumentNotFound",
            ErrorKind::DocumentParseError => "DocumentParseError",
            ErrorKind::PageNotFound => "PageNotFound",
            ErrorKind::ObjectNotFound => "ObjectNotFound",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::InvalidRequest => "InvalidRequest",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    /// No file under the documents root
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The engine rejected the file
    #[error("Failed to parse {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: PdfError,
    },

    /// 1-based page number outside `[1, count]`
    #[error("Page {page} not found (document has {count} pages)")]
    PageNotFound { page: i64, count: usize },

    #[error("Object {number} {generation} R not found")]
    ObjectNotFound { number: u32, generation: u64 },

    /// Engine failure while deriving a view that could not be contained
    #[error("Decode error: {0}")]
    Decode(#[from] PdfError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl DocumentError {
    /// Client-facing category, `None` for server faults
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DocumentError::NotFound(_) => Some(ErrorKind::DocumentNotFound),
            DocumentError::Parse { .. } => Some(ErrorKind::DocumentParseError),
            DocumentError::PageNotFound { .. } => Some(ErrorKind::PageNotFound),
            DocumentError::ObjectNotFound { .. } => Some(ErrorKind::ObjectNotFound),
            DocumentError::Decode(_) => Some(ErrorKind::DecodeError),
            DocumentError::InvalidRequest(_) => Some(ErrorKind::InvalidRequest),
            DocumentError::Io(_) | DocumentError::Task(_) => None,
        }
    }
}

impl From<tokio::task::JoinError> for DocumentError {
    fn from(err: tokio::task::JoinError) -> Self {
        DocumentError::Task(err.to_string())
    }
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            DocumentError::NotFound("a.pdf".into()).kind(),
            Some(ErrorKind::DocumentNotFound)
        );
        assert_eq!(
            DocumentError::PageNotFound { page: 0, count: 2 }.kind(),
            Some(ErrorKind::PageNotFound)
        );
        assert_eq!(
            DocumentError::Task("cancelled".into()).kind(),
            None
        );
    }

    #[test]
    fn test_kind_serializes_as_name() {
        assert_eq!(
            serde_json::to_value(ErrorKind::ObjectNotFound).unwrap(),
            serde_json::json!("ObjectNotFound")
        );
        assert_eq!(ErrorKind::DecodeError.to_string(), "DecodeError");
    }
}
