//! Per-character font selection and metrics
//!
//! Each character goes to the Unicode face matching its style when that face
//! has a glyph for it, otherwise to the built-in Helvetica/Courier variant.

use ttf_parser::{Face, GlyphId};

use crate::fonts::builtin::winansi_byte;
use crate::fonts::{BuiltinFont, FontChain, FontWeight, LoadedFont};

/// Horizontal shear used when italic has to be synthesized
pub const SYNTHETIC_ITALIC_SKEW: f32 = 0.21;

/// A font as referenced from page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontKey {
    Builtin(BuiltinFont),
    /// Index into [`FontBook::faces`]
    Embedded(usize),
}

/// Font metrics in 1/1000 em
#[derive(Debug, Clone, Copy)]
pub struct FaceMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub cap_height: f32,
    pub bbox: [f32; 4],
}

/// A parsed Unicode face ready for measuring and embedding
pub struct EmbeddedFace<'a> {
    pub font: &'a LoadedFont,
    face: Face<'a>,
    units_per_em: f32,
}

impl<'a> EmbeddedFace<'a> {
    fn new(font: &'a LoadedFont) -> Option<Self> {
        let face = font.face()?;
        let units_per_em = face.units_per_em().max(1) as f32;
        Some(Self {
            font,
            face,
            units_per_em,
        })
    }

    /// Glyph id for a character; `.notdef` counts as missing
    pub fn glyph(&self, c: char) -> Option<u16> {
        self.face.glyph_index(c).map(|g| g.0).filter(|g| *g != 0)
    }

    /// Advance of a glyph in 1/1000 em
    pub fn glyph_width(&self, gid: u16) -> f32 {
        self.face
            .glyph_hor_advance(GlyphId(gid))
            .map(|adv| adv as f32 * 1000.0 / self.units_per_em)
            .unwrap_or(0.0)
    }

    fn char_width(&self, c: char) -> f32 {
        self.glyph(c).map(|g| self.glyph_width(g)).unwrap_or(0.0)
    }

    pub fn metrics(&self) -> FaceMetrics {
        let scale = 1000.0 / self.units_per_em;
        let bbox = self.face.global_bounding_box();
        let ascent = self.face.ascender() as f32 * scale;
        FaceMetrics {
            ascent,
            descent: self.face.descender() as f32 * scale,
            cap_height: self
                .face
                .capital_height()
                .map(|h| h as f32 * scale)
                .unwrap_or(ascent * 0.7),
            bbox: [
                bbox.x_min as f32 * scale,
                bbox.y_min as f32 * scale,
                bbox.x_max as f32 * scale,
                bbox.y_max as f32 * scale,
            ],
        }
    }

    /// PostScript-style name, e.g. `DejaVuSans-BoldItalic`
    pub fn base_font_name(&self) -> String {
        let descriptor = &self.font.descriptor;
        let family: String = descriptor
            .family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let suffix = match (descriptor.weight, descriptor.italic) {
            (FontWeight::Regular, false) => "",
            (FontWeight::Bold, false) => "-Bold",
            (FontWeight::Regular, true) => "-Italic",
            (FontWeight::Bold, true) => "-BoldItalic",
        };
        format!("{}{}", family, suffix)
    }

    pub fn is_bold(&self) -> bool {
        self.font.descriptor.weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font.descriptor.italic
    }
}

/// Faces available to one rendering pass
pub struct FontBook<'a> {
    faces: Vec<EmbeddedFace<'a>>,
    regular: Option<usize>,
    bold: Option<usize>,
    italic: Option<usize>,
    bold_italic: Option<usize>,
}

impl<'a> FontBook<'a> {
    pub fn new(chain: &'a FontChain) -> Self {
        let mut book = FontBook {
            faces: Vec::new(),
            regular: None,
            bold: None,
            italic: None,
            bold_italic: None,
        };

        if let Some(family) = chain.unicode() {
            let mut add = |font: Option<&'a LoadedFont>| -> Option<usize> {
                let face = EmbeddedFace::new(font?)?;
                book.faces.push(face);
                Some(book.faces.len() - 1)
            };
            let regular = add(Some(&family.regular));
            let bold = add(Some(&family.bold));
            let italic = add(family.italic.as_ref());
            let bold_italic = add(family.bold_italic.as_ref());
            book.regular = regular;
            book.bold = bold;
            book.italic = italic;
            book.bold_italic = bold_italic;
        }
        book
    }

    pub fn faces(&self) -> &[EmbeddedFace<'a>] {
        &self.faces
    }

    pub fn face(&self, index: usize) -> Option<&EmbeddedFace<'a>> {
        self.faces.get(index)
    }

    pub fn has_unicode(&self) -> bool {
        self.regular.is_some()
    }

    /// Unicode face for a style and whether italic must be synthesized
    fn unicode_slot(&self, bold: bool, italic: bool) -> Option<(usize, bool)> {
        match (bold, italic) {
            (false, false) => self.regular.map(|i| (i, false)),
            (true, false) => self.bold.or(self.regular).map(|i| (i, false)),
            (false, true) => self
                .italic
                .map(|i| (i, false))
                .or_else(|| self.regular.map(|i| (i, true))),
            (true, true) => self
                .bold_italic
                .map(|i| (i, false))
                .or_else(|| self.bold.or(self.regular).map(|i| (i, true))),
        }
    }

    /// Font and synthetic-italic flag for one character
    pub fn pick(&self, c: char, bold: bool, italic: bool, code: bool) -> (FontKey, bool) {
        if code {
            let courier = BuiltinFont::select(bold, false, true);
            if winansi_byte(c).is_some() {
                return (FontKey::Builtin(courier), false);
            }
            return match self.unicode_slot(bold, false) {
                Some((i, skew)) if self.faces[i].glyph(c).is_some() => (FontKey::Embedded(i), skew),
                _ => (FontKey::Builtin(courier), false),
            };
        }

        if let Some((i, skew)) = self.unicode_slot(bold, italic) {
            if self.faces[i].glyph(c).is_some() {
                return (FontKey::Embedded(i), skew);
            }
        }
        (FontKey::Builtin(BuiltinFont::select(bold, italic, false)), false)
    }

    /// Advance of `c` in points
    pub fn char_width(&self, key: FontKey, c: char, size: f32) -> f32 {
        let units = match key {
            FontKey::Builtin(font) => font.char_width(c) as f32,
            FontKey::Embedded(i) => self.faces.get(i).map(|f| f.char_width(c)).unwrap_or(0.0),
        };
        units * size / 1000.0
    }
}
