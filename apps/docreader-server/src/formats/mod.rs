//! Format dispatch
//!
//! Maps a requested document to the conversion strategy for its format.
//! Dispatch looks only at the extension, or at a media type the caller
//! declared for a path without one; the content is never sniffed here.
//!
//! # Strategies
//!
//! - [`docx::DocxConverter`]: Office Open XML, paragraphs, tables, images
//! - [`doc::DocConverter`]: Word 97-2003 binary, text only
//! - [`rtf::RtfConverter`]: Rich Text Format, text with basic emphasis

pub mod doc;
pub mod docx;
pub mod rtf;
pub mod xml;

use std::fmt;

use crate::convert::Converter;
use crate::error::{ConversionError, Result};
use crate::resolver::ResolvedPath;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Docx,
    Doc,
    Rtf,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 3] = [Self::Docx, Self::Doc, Self::Rtf];

    /// Detect format from a file extension (with or without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "rtf" => Some(Self::Rtf),
            _ => None,
        }
    }

    /// Detect format from a media type; parameters are ignored
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.media_types().contains(&essence.as_str()))
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Rtf => "rtf",
        }
    }

    /// Media types; the first is canonical
    pub fn media_types(self) -> &'static [&'static str] {
        match self {
            Self::Docx => {
                &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"]
            }
            Self::Doc => &["application/msword"],
            Self::Rtf => &["application/rtf", "text/rtf"],
        }
    }

    pub fn converter(self) -> &'static dyn Converter {
        match self {
            Self::Docx => &docx::DocxConverter,
            Self::Doc => &doc::DocConverter,
            Self::Rtf => &rtf::RtfConverter,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docx => write!(f, "DOCX"),
            Self::Doc => write!(f, "DOC"),
            Self::Rtf => write!(f, "RTF"),
        }
    }
}

/// Selects the conversion strategy for a resolved document
pub struct FormatDispatcher;

impl FormatDispatcher {
    /// The extension decides; a media type declared by the caller is only
    /// consulted for paths without an extension
    pub fn dispatch(resolved: &ResolvedPath, declared: Option<&str>) -> Result<DocumentFormat> {
        let extension = resolved.extension();
        if let Some(format) = DocumentFormat::from_extension(&extension) {
            return Ok(format);
        }

        if extension.is_empty() {
            if let Some(format) = declared.and_then(DocumentFormat::from_media_type) {
                tracing::debug!("Dispatching {} as {} by declared media type", resolved.requested, format);
                return Ok(format);
            }
        }

        tracing::debug!(
            "No converter for .{} (media type {})",
            extension,
            mime_guess::from_path(&resolved.full_path).first_or_octet_stream()
        );
        Err(ConversionError::UnsupportedFormat {
            extension,
            requested: resolved.requested.clone(),
            full_path: resolved.full_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn resolved(name: &str) -> ResolvedPath {
        ResolvedPath {
            requested: name.to_string(),
            full_path: PathBuf::from("/srv/docs").join(name),
        }
    }

    #[test]
    fn test_dispatch_supported() {
        assert_eq!(FormatDispatcher::dispatch(&resolved("notes.docx"), None).unwrap(), DocumentFormat::Docx);
        assert_eq!(FormatDispatcher::dispatch(&resolved("OLD.DOC"), None).unwrap(), DocumentFormat::Doc);
        assert_eq!(FormatDispatcher::dispatch(&resolved("memo.rtf"), None).unwrap(), DocumentFormat::Rtf);
    }

    #[test]
    fn test_dispatch_unsupported() {
        let names = [
            "report.xlsx",
            "slides.pptx",
            "deck.ppt",
            "README",
            "image.png",
            "template.dot",
            "x.wiz",
            "macro.docm",
            "a.txt",
        ];
        for name in names {
            let err = FormatDispatcher::dispatch(&resolved(name), None).unwrap_err();
            assert_eq!(err.error_type(), "UnsupportedFormat", "{}", name);
            assert_eq!(err.requested_path(), Some(name));
        }
    }

    #[test]
    fn test_declared_media_type() {
        assert_eq!(
            FormatDispatcher::dispatch(&resolved("README"), Some("text/rtf")).unwrap(),
            DocumentFormat::Rtf
        );
        // the extension wins over a declared type
        let err = FormatDispatcher::dispatch(&resolved("template.dot"), Some("application/msword"))
            .unwrap_err();
        assert_eq!(err.error_type(), "UnsupportedFormat");
        assert_eq!(
            FormatDispatcher::dispatch(&resolved("memo.rtf"), Some("application/msword")).unwrap(),
            DocumentFormat::Rtf
        );
        assert!(FormatDispatcher::dispatch(&resolved("README"), Some("text/plain")).is_err());
    }

    #[test]
    fn test_media_types() {
        assert_eq!(
            DocumentFormat::from_media_type("text/rtf; charset=us-ascii"),
            Some(DocumentFormat::Rtf)
        );
        assert_eq!(
            DocumentFormat::from_media_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_media_type("application/pdf"), None);
    }

    #[test]
    fn test_converter_matches_format() {
        for format in DocumentFormat::ALL {
            assert_eq!(format.converter().format(), format);
            assert_eq!(DocumentFormat::from_extension(format.extension()), Some(format));
        }
    }
}
