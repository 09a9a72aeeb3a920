//! PDF rendering
//!
//! Turns the document model into a paginated PDF. Layout and serialization
//! are separate passes: [`layout`] positions everything on pages, [`writer`]
//! encodes those pages and embeds the fonts and images they reference.

pub mod fonts;
pub mod images;
pub mod layout;
pub mod writer;

use anyhow::Result;

use crate::convert::PageGeometry;
use crate::document::Document;
use crate::fonts::FontChain;

use self::fonts::FontBook;

pub use layout::PLACEHOLDER_TEXT;

pub fn render_pdf(document: &Document, geometry: &PageGeometry, fonts: &FontChain) -> Result<Vec<u8>> {
    let book = FontBook::new(fonts);
    let laid = layout::layout(document, geometry, &book);
    tracing::debug!(
        "Laid out {} page(s) with {} font family",
        laid.pages.len(),
        fonts.family_name()
    );
    writer::write(&laid, geometry, &book)
}
