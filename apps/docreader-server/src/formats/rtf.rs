//! RTF strategy
//!
//! `rtf-parser` supplies styled text blocks. Some writers emit paragraph
//! marks the parser folds away; for those documents (and ones it rejects) a
//! small raw reader walks the control words directly.

use anyhow::{Context, Result};

use super::DocumentFormat;
use crate::convert::Converter;
use crate::document::{Block, Document, Paragraph, ParagraphKind, Run, RunStyle};
use crate::fonts::builtin::{cp1252_char, decode_cp1252};

pub struct RtfConverter;

impl Converter for RtfConverter {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Rtf
    }

    fn parse(&self, bytes: &[u8]) -> Result<Document> {
        parse_rtf(bytes).context("RTF to PDF conversion error")
    }
}

/// RTF is 7-bit in practice; anything that is not UTF-8 is read as cp1252
fn decode_source(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => decode_cp1252(bytes),
    }
}

fn parse_rtf(bytes: &[u8]) -> Result<Document> {
    let source = decode_source(bytes);
    let source = source.trim_start_matches('\u{feff}');
    if !source.trim_start().starts_with("{\\rtf") {
        anyhow::bail!("File is not an RTF document (missing {{\\rtf header)");
    }

    let parsed = match rtf_parser::RtfDocument::try_from(source) {
        Ok(doc) => Some(paragraphs_from_blocks(&doc)),
        Err(e) => {
            tracing::debug!("rtf-parser rejected document, reading raw control words: {}", e);
            None
        }
    };

    let paragraphs = match parsed {
        Some(p) if has_text(&p) && (p.len() > 1 || !source.contains("\\par")) => p,
        _ => RawReader::new(source).read(),
    };

    if !has_text(&paragraphs) {
        tracing::debug!("RTF document has no readable text");
    }

    Ok(to_document(paragraphs))
}

fn has_text(paragraphs: &[Vec<Run>]) -> bool {
    paragraphs
        .iter()
        .flatten()
        .any(|run| !run.text.trim().is_empty())
}

fn paragraphs_from_blocks(doc: &rtf_parser::RtfDocument) -> Vec<Vec<Run>> {
    let mut paragraphs = vec![Vec::new()];
    for block in &doc.body {
        let style = RunStyle {
            bold: block.painter.bold,
            italic: block.painter.italic,
            underline: block.painter.underline,
            ..Default::default()
        };
        let text = block.text.replace('\r', "");
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                paragraphs.push(Vec::new());
            }
            if !piece.is_empty() {
                if let Some(current) = paragraphs.last_mut() {
                    current.push(Run::styled(piece, style.clone()));
                }
            }
        }
    }
    paragraphs
}

/// Blank paragraphs become spacers; leading and trailing ones are dropped
fn to_document(paragraphs: Vec<Vec<Run>>) -> Document {
    let blocks = paragraphs
        .into_iter()
        .map(|runs| {
            let paragraph = Paragraph::new(ParagraphKind::Normal, runs);
            if paragraph.is_blank() {
                Block::Spacer
            } else {
                Block::Paragraph(paragraph.trim())
            }
        })
        .collect();

    Document::new(blocks).trim_spacers()
}

/// Groups whose content is never body text
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "footnote",
    "fldinst",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "themedata",
    "colorschememapping",
    "datastore",
    "latentstyles",
    "filetbl",
    "revtbl",
    "xmlnstbl",
];

#[derive(Debug, Clone, Copy)]
struct GroupState {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    skip: bool,
    /// Fallback characters following a `\u` escape
    uc: usize,
}

impl Default for GroupState {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strike: false,
            skip: false,
            uc: 1,
        }
    }
}

impl GroupState {
    fn style(&self) -> RunStyle {
        RunStyle {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strike: self.strike,
            ..Default::default()
        }
    }
}

struct RawReader {
    chars: Vec<char>,
    pos: usize,
    state: GroupState,
    stack: Vec<GroupState>,
    paragraphs: Vec<Vec<Run>>,
    runs: Vec<Run>,
    pending: String,
    pending_style: RunStyle,
}

impl RawReader {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            state: GroupState::default(),
            stack: Vec::new(),
            paragraphs: Vec::new(),
            runs: Vec::new(),
            pending: String::new(),
            pending_style: RunStyle::default(),
        }
    }

    fn read(mut self) -> Vec<Vec<Run>> {
        while let Some(c) = self.next() {
            match c {
                '{' => self.stack.push(self.state),
                '}' => {
                    if let Some(state) = self.stack.pop() {
                        self.state = state;
                    }
                }
                '\\' => self.control(),
                '\r' | '\n' => {}
                _ => self.push_char(c),
            }
        }
        self.end_paragraph();
        self.paragraphs
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        self.pos += 1;
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn control(&mut self) {
        let Some(c) = self.next() else {
            return;
        };
        match c {
            '\\' | '{' | '}' => self.push_char(c),
            '\'' => {
                if let Some(byte) = self.hex_byte() {
                    self.push_char(cp1252_char(byte));
                }
            }
            '~' => self.push_char('\u{A0}'),
            '_' => self.push_char('-'),
            '-' => {}
            '*' => self.state.skip = true,
            '\r' | '\n' => self.end_paragraph(),
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(next) = self.peek().filter(|n| n.is_ascii_alphabetic()) {
                    word.push(next);
                    self.pos += 1;
                }
                let param = self.parameter();
                if self.peek() == Some(' ') {
                    self.pos += 1;
                }
                self.control_word(&word, param);
            }
            _ => {}
        }
    }

    fn hex_byte(&mut self) -> Option<u8> {
        let hex: String = self.chars.get(self.pos..self.pos + 2)?.iter().collect();
        let byte = u8::from_str_radix(&hex, 16).ok()?;
        self.pos += 2;
        Some(byte)
    }

    fn parameter(&mut self) -> Option<i32> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        match digits.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                // a lone '-' is text, not a parameter
                self.pos = start;
                None
            }
        }
    }

    fn control_word(&mut self, word: &str, param: Option<i32>) {
        let on = param.map_or(true, |p| p != 0);
        match word {
            "par" | "sect" | "page" => self.end_paragraph(),
            "line" => self.push_char('\n'),
            "tab" => self.push_char('\t'),
            "cell" => self.push_char('\t'),
            "row" => self.end_paragraph(),
            "emdash" => self.push_char('—'),
            "endash" => self.push_char('–'),
            "bullet" => self.push_char('•'),
            "lquote" => self.push_char('‘'),
            "rquote" => self.push_char('’'),
            "ldblquote" => self.push_char('“'),
            "rdblquote" => self.push_char('”'),
            "u" => {
                if let Some(code) = param {
                    let code = if code < 0 { code + 65536 } else { code };
                    if let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32) {
                        self.push_char(ch);
                    }
                    self.skip_fallback();
                }
            }
            "uc" => self.state.uc = param.unwrap_or(1).max(0) as usize,
            "b" => self.state.bold = on,
            "i" => self.state.italic = on,
            "ul" => self.state.underline = on,
            "ulnone" => self.state.underline = false,
            "strike" => self.state.strike = on,
            "plain" => {
                self.state.bold = false;
                self.state.italic = false;
                self.state.underline = false;
                self.state.strike = false;
            }
            w if SKIPPED_DESTINATIONS.contains(&w) => self.state.skip = true,
            _ => {}
        }
    }

    /// Skip the ANSI stand-in characters after `\uN`
    fn skip_fallback(&mut self) {
        for _ in 0..self.state.uc {
            match self.peek() {
                Some('\\') if self.chars.get(self.pos + 1) == Some(&'\'') => self.pos += 4,
                Some('{') | Some('}') | Some('\\') | None => break,
                Some(_) => self.pos += 1,
            }
        }
    }

    fn push_char(&mut self, c: char) {
        if self.state.skip {
            return;
        }
        let style = self.state.style();
        if style != self.pending_style {
            self.flush_run();
            self.pending_style = style;
        }
        self.pending.push(c);
    }

    fn flush_run(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.runs.push(Run::styled(text, self.pending_style.clone()));
        }
    }

    fn end_paragraph(&mut self) {
        if self.state.skip {
            return;
        }
        self.flush_run();
        self.paragraphs.push(std::mem::take(&mut self.runs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(doc: &Document) -> Vec<String> {
        doc.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.text()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_paragraphs_are_preserved() {
        let rtf = br"{\rtf1\ansi\deff0 {\fonttbl {\f0 Times New Roman;}}
\f0\fs24 First paragraph.\par
Second paragraph.\par
}";
        let doc = RtfConverter.parse(rtf).unwrap();
        assert_eq!(texts(&doc), vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn test_raw_reader_formatting_and_escapes() {
        let rtf = r"{\rtf1\ansi{\fonttbl{\f0 Arial;}}{\colortbl;\red255\green0\blue0;}
Caf\'e9 {\b bold} \u8364? and \i italic\i0 .\par
{\*\generator Writer;}Tab\tab end\line next\par}";
        let paragraphs = RawReader::new(rtf).read();
        let first: String = paragraphs[0].iter().map(|r| r.text.as_str()).collect();
        assert_eq!(first, "Café bold € and italic.");
        assert!(paragraphs[0].iter().any(|r| r.text == "bold" && r.style.bold));
        assert!(paragraphs[0].iter().any(|r| r.text == "italic" && r.style.italic));

        let second: String = paragraphs[1].iter().map(|r| r.text.as_str()).collect();
        assert_eq!(second, "Tab\tend\nnext");
    }

    #[test]
    fn test_font_table_is_not_text() {
        let rtf = r"{\rtf1{\fonttbl{\f0\fswiss Helvetica;}}{\info{\title Secret}}Body\par}";
        let paragraphs = RawReader::new(rtf).read();
        let all: String = paragraphs.iter().flatten().map(|r| r.text.as_str()).collect();
        assert_eq!(all, "Body");
    }

    #[test]
    fn test_cp1252_source() {
        let mut rtf = b"{\\rtf1\\ansi Na".to_vec();
        rtf.push(0xEF);
        rtf.extend_from_slice(b"ve\\par}");
        let doc = RtfConverter.parse(&rtf).unwrap();
        assert_eq!(texts(&doc), vec!["Naïve"]);
    }

    #[test]
    fn test_not_rtf() {
        let err = RtfConverter.parse(b"hello").unwrap_err();
        assert!(format!("{:#}", err).contains("missing {\\rtf header"));
    }

    #[test]
    fn test_blank_lines_become_spacers() {
        let doc = to_document(vec![
            vec![],
            vec![Run::plain("One")],
            vec![Run::plain("  ")],
            vec![Run::plain("Two")],
            vec![],
        ]);
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.blocks[1], Block::Spacer);
    }
}
