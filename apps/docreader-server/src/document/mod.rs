//! Format-neutral document model
//!
//! Every format strategy (DOCX, DOC, RTF) parses into this model and the PDF
//! renderer only ever sees these types. The model keeps just what the
//! renderer can lay out: paragraphs with styled runs, simple tables, inline
//! images, rules and vertical spacers, in document order.

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Parse a 6-digit hex color (`"365F91"` or `"#365F91"`)
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Channels as PDF fill/stroke operands (0.0..=1.0)
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

/// Vertical position of a run relative to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlign {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

/// Character formatting for a run of text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Monospace (code) run, rendered in Courier
    pub code: bool,
    pub vertical: VerticalAlign,
    pub color: Option<Rgb>,
}

/// A run of text sharing one [`RunStyle`]
///
/// `text` may contain `'\n'` (forced line break) and `'\t'`.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Block-level role of a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphKind {
    #[default]
    Normal,
    /// Heading level, 1-based; levels past 3 render like level 3
    Heading(u8),
    /// List item; `level` 0 is the outermost list
    ListItem { ordered: bool, level: u8 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub kind: ParagraphKind,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(kind: ParagraphKind, runs: Vec<Run>) -> Self {
        Self { kind, runs }
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    /// Strip leading whitespace of the first run and trailing whitespace of
    /// the last run, dropping runs that become empty
    pub fn trim(mut self) -> Self {
        while self
            .runs
            .first()
            .is_some_and(|r| r.text.trim_start().is_empty())
        {
            self.runs.remove(0);
        }
        while self.runs.last().is_some_and(|r| r.text.trim_end().is_empty()) {
            self.runs.pop();
        }
        if let Some(first) = self.runs.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = self.runs.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        self
    }
}

/// Table of plain-text cells; the first row is treated as the header
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Encoded image bytes (PNG, JPEG, GIF or BMP) as stored in the source
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Image(ImageData),
    /// Horizontal divider line
    Rule,
    /// Empty line of vertical space
    Spacer,
}

/// Parsed document, blocks in reading order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// True when no block would produce visible content
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| match block {
            Block::Paragraph(p) => p.is_blank(),
            Block::Table(t) => t.rows.iter().flatten().all(|c| c.trim().is_empty()),
            Block::Image(_) | Block::Rule => false,
            Block::Spacer => true,
        })
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Drop spacers before the first and after the last content block
    pub fn trim_spacers(mut self) -> Self {
        while self.blocks.last() == Some(&Block::Spacer) {
            self.blocks.pop();
        }
        let leading = self
            .blocks
            .iter()
            .take_while(|b| **b == Block::Spacer)
            .count();
        self.blocks.drain(..leading);
        self
    }

    /// Split plain text into paragraphs, one per line; blank lines become spacers
    pub fn from_plain_paragraphs<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let blocks = lines
            .into_iter()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    Block::Spacer
                } else {
                    Block::Paragraph(Paragraph::new(
                        ParagraphKind::Normal,
                        vec![Run::plain(trimmed)],
                    ))
                }
            })
            .collect();
        Self { blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_hex() {
        assert_eq!(Rgb::from_hex("365F91"), Some(Rgb(0x36, 0x5F, 0x91)));
        assert_eq!(Rgb::from_hex("#ff0000"), Some(Rgb(255, 0, 0)));
        assert_eq!(Rgb::from_hex("auto"), None);
        assert_eq!(Rgb::from_hex("12345"), None);
    }

    #[test]
    fn test_paragraph_trim() {
        let paragraph = Paragraph::new(
            ParagraphKind::Normal,
            vec![Run::plain("  "), Run::plain("  Hello "), Run::plain("world  ")],
        )
        .trim();
        assert_eq!(paragraph.text(), "Hello world");
        assert_eq!(paragraph.runs.len(), 2);
    }

    #[test]
    fn test_document_is_empty() {
        let mut doc = Document::default();
        assert!(doc.is_empty());
        doc.push(Block::Spacer);
        doc.push(Block::Paragraph(Paragraph::new(
            ParagraphKind::Normal,
            vec![Run::plain("   ")],
        )));
        assert!(doc.is_empty());
        doc.push(Block::Rule);
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_from_plain_paragraphs() {
        let doc = Document::from_plain_paragraphs(["First", "", "Second"]);
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.blocks[1], Block::Spacer);
    }

    #[test]
    fn test_trim_spacers() {
        let doc = Document::from_plain_paragraphs(["", " ", "Body", "", "End", ""]).trim_spacers();
        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(&doc.blocks[0], Block::Paragraph(p) if p.text() == "Body"));
        assert_eq!(Document::default().trim_spacers().blocks.len(), 0);
    }
}
