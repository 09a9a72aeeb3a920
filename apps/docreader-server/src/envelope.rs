//! Transport envelope
//!
//! JSON shapes exchanged with the viewer and the [`ResponseEncoder`] that
//! packages converter output (or a [`ConversionError`]) into them.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, Result};

/// Every PDF file starts with this marker
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Conversion request body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConversionRequest {
    #[serde(default)]
    pub path: String,
    /// Media type declared by the caller, used when the path has no extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Successful conversion
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionSuccess {
    pub success: bool,
    /// Base64 (standard alphabet) encoded PDF bytes
    pub pdf_data: String,
    pub filename: String,
}

/// Failed conversion
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionFailureBody {
    pub success: bool,
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
}

/// Packages conversion outcomes for transport
pub struct ResponseEncoder;

impl ResponseEncoder {
    /// Wrap PDF bytes for the requested document
    ///
    /// Bytes that do not carry the PDF signature are reported as a
    /// conversion failure instead of being shipped as a corrupt success.
    pub fn encode_success(pdf: &[u8], requested: &str) -> Result<ConversionSuccess> {
        if !pdf.starts_with(PDF_SIGNATURE) {
            return Err(ConversionError::ConversionFailure {
                message: format!(
                    "Converter produced {} bytes without a PDF signature",
                    pdf.len()
                ),
                trace: None,
                location: None,
            });
        }

        Ok(ConversionSuccess {
            success: true,
            pdf_data: STANDARD.encode(pdf),
            filename: Self::output_filename(requested),
        })
    }

    pub fn encode_failure(err: &ConversionError) -> ConversionFailureBody {
        ConversionFailureBody {
            success: false,
            error: err.to_string(),
            error_type: err.error_type().to_string(),
            traceback: err.trace(),
            file_path: err.requested_path().map(str::to_string),
            full_path: err.full_path().map(|p| p.display().to_string()),
        }
    }

    /// `<stem>.pdf` for the requested path
    pub fn output_filename(requested: &str) -> String {
        let stem = Path::new(requested.trim())
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document");
        format!("{}.pdf", stem)
    }

    /// Inverse of the success encoding
    pub fn decode_pdf_data(pdf_data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(pdf_data.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_encode_success() {
        let pdf = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let encoded = ResponseEncoder::encode_success(&pdf, "reports/q3 notes.docx").unwrap();
        assert!(encoded.success);
        assert_eq!(encoded.filename, "q3 notes.pdf");
        assert_eq!(ResponseEncoder::decode_pdf_data(&encoded.pdf_data).unwrap(), pdf);
    }

    #[test]
    fn test_encode_success_rejects_non_pdf() {
        let err = ResponseEncoder::encode_success(b"PK\x03\x04", "notes.docx").unwrap_err();
        assert_eq!(err.error_type(), "ConversionFailure");
    }

    #[test]
    fn test_base64_round_trip_arbitrary_bytes() {
        let mut bytes = PDF_SIGNATURE.to_vec();
        bytes.extend((0..=255u8).rev());
        bytes.extend([0, 0, 0xFF, 0xFE]);
        let encoded = ResponseEncoder::encode_success(&bytes, "a.rtf").unwrap();
        assert_eq!(ResponseEncoder::decode_pdf_data(&encoded.pdf_data).unwrap(), bytes);
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(ResponseEncoder::output_filename("notes.docx"), "notes.pdf");
        assert_eq!(ResponseEncoder::output_filename("dir/Old.File.doc"), "Old.File.pdf");
        assert_eq!(ResponseEncoder::output_filename(""), "document.pdf");
    }

    #[test]
    fn test_failure_omits_absent_fields() {
        let body = ResponseEncoder::encode_failure(&ConversionError::InvalidRequest(
            "No file path provided".into(),
        ));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_type"], "InvalidRequest");
        assert_eq!(json["error"], "No file path provided");
        assert!(json.get("traceback").is_none());
        assert!(json.get("file_path").is_none());
    }

    #[test]
    fn test_failure_echoes_paths() {
        let body = ResponseEncoder::encode_failure(&ConversionError::PathNotFound {
            requested: "missing.docx".into(),
            full_path: PathBuf::from("/srv/docs/missing.docx"),
            reason: "No such file or directory".into(),
        });
        assert_eq!(body.file_path.as_deref(), Some("missing.docx"));
        assert_eq!(body.full_path.as_deref(), Some("/srv/docs/missing.docx"));
        assert_eq!(body.error_type, "PathNotFound");
    }
}
