//! Converter boundary
//!
//! A converter turns the raw bytes of one document into PDF bytes. It runs
//! synchronously, entirely in memory, and never writes to disk.

use crate::document::Document;
use crate::fonts::FontChain;
use crate::formats::DocumentFormat;
use crate::render;

/// Page size and margins in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// US Letter with half-inch margins
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 36.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::letter()
    }
}

/// Format-specific conversion strategy
pub trait Converter: Send + Sync {
    fn format(&self) -> DocumentFormat;

    /// Parse the source bytes into the document model
    fn parse(&self, bytes: &[u8]) -> anyhow::Result<Document>;

    /// Produce a PDF for the source bytes
    fn convert(
        &self,
        bytes: &[u8],
        geometry: &PageGeometry,
        fonts: &FontChain,
    ) -> anyhow::Result<Vec<u8>> {
        let document = self.parse(bytes)?;
        tracing::debug!(
            "Parsed {} document: {} block(s)",
            self.format(),
            document.blocks.len()
        );
        render::render_pdf(&document, geometry, fonts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_geometry() {
        let geometry = PageGeometry::letter();
        assert_eq!(geometry.content_width(), 540.0);
        assert_eq!(geometry.content_height(), 720.0);
        assert_eq!(PageGeometry::default(), geometry);
    }
}
