//! Error types for the DocReader server
//!
//! Every request-time failure is a [`ConversionError`]. The variant decides
//! the HTTP status and the `error_type` tag of the failure envelope; the
//! response body itself is produced by [`ResponseEncoder`].

use std::path::{Path, PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::envelope::ResponseEncoder;
use crate::resolver::ResolvedPath;

/// Result type for the conversion pipeline
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Conversion pipeline error
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Request body missing, malformed, or without a path
    #[error("{0}")]
    InvalidRequest(String),

    /// Path missing, unreadable, or outside the content root
    #[error("File not found: {requested}")]
    PathNotFound {
        requested: String,
        full_path: PathBuf,
        reason: String,
    },

    /// Extension outside the supported set
    #[error("Unsupported file type: {}", display_extension(.extension))]
    UnsupportedFormat {
        extension: String,
        requested: String,
        full_path: PathBuf,
    },

    /// The format converter failed while parsing, laying out or writing
    #[error("Conversion failed: {message}")]
    ConversionFailure {
        message: String,
        trace: Option<String>,
        location: Option<ResolvedPath>,
    },

    #[error("Conversion timed out after {seconds} seconds")]
    Timeout {
        seconds: u64,
        location: Option<ResolvedPath>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_extension(extension: &str) -> String {
    if extension.is_empty() {
        "(no extension)".to_string()
    } else {
        format!(".{}", extension)
    }
}

impl ConversionError {
    /// Wrap a converter error, keeping its context chain as the trace
    pub fn failure(err: anyhow::Error) -> Self {
        ConversionError::ConversionFailure {
            message: format!("{:#}", err),
            trace: Some(format!("{:?}", err)),
            location: None,
        }
    }

    /// Attach the resolved paths so they are echoed back to the user
    pub fn located(self, at: &ResolvedPath) -> Self {
        match self {
            ConversionError::ConversionFailure { message, trace, .. } => {
                ConversionError::ConversionFailure {
                    message,
                    trace,
                    location: Some(at.clone()),
                }
            }
            ConversionError::Timeout { seconds, .. } => ConversionError::Timeout {
                seconds,
                location: Some(at.clone()),
            },
            other => other,
        }
    }

    /// Coarse classification tag (`error_type` in the envelope)
    pub fn error_type(&self) -> &'static str {
        match self {
            ConversionError::InvalidRequest(_) => "InvalidRequest",
            ConversionError::PathNotFound { .. } => "PathNotFound",
            ConversionError::UnsupportedFormat { .. } => "UnsupportedFormat",
            ConversionError::ConversionFailure { .. } => "ConversionFailure",
            ConversionError::Timeout { .. } => "ConversionTimeout",
            ConversionError::Internal(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ConversionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ConversionError::PathNotFound { .. } => StatusCode::NOT_FOUND,
            ConversionError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            ConversionError::ConversionFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ConversionError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ConversionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Full diagnostic trace, when one was captured
    pub fn trace(&self) -> Option<String> {
        match self {
            ConversionError::ConversionFailure { trace, .. } => trace.clone(),
            ConversionError::PathNotFound { reason, .. } => Some(reason.clone()),
            _ => None,
        }
    }

    /// Requested path as sent by the client
    pub fn requested_path(&self) -> Option<&str> {
        match self {
            ConversionError::PathNotFound { requested, .. }
            | ConversionError::UnsupportedFormat { requested, .. } => Some(requested),
            ConversionError::ConversionFailure { location, .. }
            | ConversionError::Timeout { location, .. } => {
                location.as_ref().map(|l| l.requested.as_str())
            }
            _ => None,
        }
    }

    /// Server-side path the request resolved (or failed to resolve) to
    pub fn full_path(&self) -> Option<&Path> {
        match self {
            ConversionError::PathNotFound { full_path, .. }
            | ConversionError::UnsupportedFormat { full_path, .. } => Some(full_path),
            ConversionError::ConversionFailure { location, .. }
            | ConversionError::Timeout { location, .. } => {
                location.as_ref().map(|l| l.full_path.as_path())
            }
            _ => None,
        }
    }
}

impl IntoResponse for ConversionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ConversionError::ConversionFailure { trace, .. } => {
                tracing::error!(
                    "{}\n{}",
                    self,
                    trace.as_deref().unwrap_or("(no trace captured)")
                );
            }
            ConversionError::Timeout { .. } | ConversionError::Internal(_) => {
                tracing::error!("{}", self);
            }
            _ => {
                tracing::warn!("Rejected conversion request ({}): {}", self.error_type(), self);
            }
        }

        (status, Json(ResponseEncoder::encode_failure(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> ResolvedPath {
        ResolvedPath {
            requested: "notes.docx".to_string(),
            full_path: PathBuf::from("/srv/notes.docx"),
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ConversionError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let not_found = ConversionError::PathNotFound {
            requested: "a.docx".into(),
            full_path: PathBuf::from("/srv/a.docx"),
            reason: "No such file or directory".into(),
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.error_type(), "PathNotFound");
        assert_eq!(
            ConversionError::Timeout { seconds: 5, location: None }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_failure_keeps_context_chain() {
        let err = anyhow::anyhow!("missing word/document.xml").context("DOCX to PDF conversion error");
        let failure = ConversionError::failure(err);
        assert_eq!(failure.error_type(), "ConversionFailure");
        assert!(failure.to_string().contains("DOCX to PDF conversion error"));
        assert!(failure.to_string().contains("missing word/document.xml"));
        assert!(failure.trace().unwrap().contains("Caused by"));
    }

    #[test]
    fn test_located_attaches_paths() {
        let failure = ConversionError::failure(anyhow::anyhow!("boom")).located(&location());
        assert_eq!(failure.requested_path(), Some("notes.docx"));
        assert_eq!(failure.full_path(), Some(Path::new("/srv/notes.docx")));

        let invalid = ConversionError::InvalidRequest("no path".into()).located(&location());
        assert_eq!(invalid.requested_path(), None);
    }

    #[test]
    fn test_unsupported_message_names_extension() {
        let err = ConversionError::UnsupportedFormat {
            extension: "xlsx".into(),
            requested: "report.xlsx".into(),
            full_path: PathBuf::from("/srv/report.xlsx"),
        };
        assert_eq!(err.to_string(), "Unsupported file type: .xlsx");
    }
}
