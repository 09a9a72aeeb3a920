//! Transport envelope as seen by the viewer
//!
//! Mirrors the JSON the conversion server answers with. Failures from any
//! layer (server, transport, decoding, rendering) end up as one
//! [`ConversionFailure`] so the viewer has a single failure shape to show.

use serde::{Deserialize, Serialize};

/// Client-side classification tags
pub const TRANSPORT_FAILURE: &str = "TransportFailure";
pub const DECODE_FAILURE: &str = "DecodeFailure";
pub const RENDER_FAILURE: &str = "RenderFailure";
/// Same tag the server uses for formats it cannot convert
pub const UNSUPPORTED_FORMAT: &str = "UnsupportedFormat";

#[derive(Debug, Clone, Serialize)]
pub struct ConversionRequest<'a> {
    pub path: &'a str,
}

/// A converted document, still base64 encoded
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConvertedDocument {
    pub pdf_data: String,
    pub filename: String,
}

/// Structured failure shown in the viewer's error panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub error: String,
    #[serde(default = "transport_failure_tag")]
    pub error_type: String,
    #[serde(default)]
    pub traceback: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub full_path: Option<String>,
}

fn transport_failure_tag() -> String {
    TRANSPORT_FAILURE.to_string()
}

impl ConversionFailure {
    pub fn new(error_type: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type: error_type.to_string(),
            traceback: None,
            file_path: None,
            full_path: None,
        }
    }

    pub fn transport(error: impl Into<String>) -> Self {
        Self::new(TRANSPORT_FAILURE, error)
    }

    pub fn with_path(mut self, path: &str) -> Self {
        if self.file_path.is_none() {
            self.file_path = Some(path.to_string());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_defaults_tag() {
        let failure: ConversionFailure = serde_json::from_str(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(failure.error_type, TRANSPORT_FAILURE);
        assert_eq!(failure.traceback, None);
    }

    #[test]
    fn test_with_path_keeps_server_path() {
        let failure = ConversionFailure {
            file_path: Some("a.docx".into()),
            ..ConversionFailure::transport("x")
        }
        .with_path("b.docx");
        assert_eq!(failure.file_path.as_deref(), Some("a.docx"));
        assert_eq!(
            ConversionFailure::transport("x").with_path("b.docx").file_path.as_deref(),
            Some("b.docx")
        );
    }
}
