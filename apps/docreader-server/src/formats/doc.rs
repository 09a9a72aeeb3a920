//! Word 97-2003 (.doc) strategy
//!
//! Text-only extraction from the binary format: the FIB in the
//! `WordDocument` stream points at the piece table (CLX) in the table
//! stream, and each piece is either cp1252 ("compressed") or UTF-16LE.
//! Formatting, images and headers are not recovered.

use std::io::{Cursor, Read};

use anyhow::{Context, Result};

use super::DocumentFormat;
use crate::convert::Converter;
use crate::document::Document;
use crate::fonts::builtin::decode_cp1252;

/// OLE2 / CFB magic, shared by every legacy Office format
const CFB_MAGIC_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// `wIdent` of a Word 97+ FIB
const WORD_IDENT: u16 = 0xA5EC;

mod fib {
    pub const IDENT: usize = 0x00;
    pub const FLAGS: usize = 0x0A;
    pub const FC_MIN: usize = 0x18;
    pub const CCP_TEXT: usize = 0x4C;
    pub const FC_CLX: usize = 0x1A2;
    pub const LCB_CLX: usize = 0x1A6;
    /// Smallest FIB that reaches the CLX pointers
    pub const MIN_LEN: usize = 0x1AA;

    pub const F_ENCRYPTED: u16 = 0x0100;
    pub const F_WHICH_TBL_STM: u16 = 0x0200;
}

/// Piece descriptor flag: text stored as 8-bit cp1252 at `fc / 2`
const FC_COMPRESSED: u32 = 0x4000_0000;

pub struct DocConverter;

impl Converter for DocConverter {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Doc
    }

    fn parse(&self, bytes: &[u8]) -> Result<Document> {
        let text = extract_text(bytes).context("DOC to PDF conversion error")?;
        let paragraphs = split_paragraphs(&text);
        Ok(Document::from_plain_paragraphs(paragraphs.iter().map(String::as_str)).trim_spacers())
    }
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_stream(
    comp: &mut cfb::CompoundFile<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut stream = comp
        .open_stream(name)
        .with_context(|| format!("Failed to open stream: {}", name))?;
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to read stream: {}", name))?;
    Ok(buf)
}

/// Main document text with Word's control characters still in place
fn extract_text(bytes: &[u8]) -> Result<String> {
    if !bytes.starts_with(&CFB_MAGIC_SIGNATURE) {
        anyhow::bail!("File is not a Word 97-2003 document (missing OLE signature)");
    }

    let mut comp = cfb::CompoundFile::open(Cursor::new(bytes))
        .context("Failed to parse as OLE Compound Document")?;
    let word = read_stream(&mut comp, "WordDocument")?;

    if word.len() < fib::MIN_LEN {
        anyhow::bail!("WordDocument stream too short for a FIB ({} bytes)", word.len());
    }
    let ident = read_u16(&word, fib::IDENT).unwrap_or(0);
    if ident != WORD_IDENT {
        anyhow::bail!("Unsupported Word version (FIB identifier {:#06x})", ident);
    }
    let flags = read_u16(&word, fib::FLAGS).unwrap_or(0);
    if flags & fib::F_ENCRYPTED != 0 {
        anyhow::bail!("Encrypted documents are not supported");
    }

    let ccp_text = read_u32(&word, fib::CCP_TEXT).unwrap_or(0) as usize;
    let fc_clx = read_u32(&word, fib::FC_CLX).unwrap_or(0) as usize;
    let lcb_clx = read_u32(&word, fib::LCB_CLX).unwrap_or(0) as usize;

    if lcb_clx == 0 {
        // no piece table: the text is one contiguous cp1252 run
        let fc_min = read_u32(&word, fib::FC_MIN).unwrap_or(0) as usize;
        let text = word
            .get(fc_min..fc_min + ccp_text)
            .context("Text range lies outside the WordDocument stream")?;
        return Ok(decode_cp1252(text));
    }

    let table_name = if flags & fib::F_WHICH_TBL_STM != 0 {
        "1Table"
    } else {
        "0Table"
    };
    let table = read_stream(&mut comp, table_name)?;
    let clx = table
        .get(fc_clx..fc_clx + lcb_clx)
        .context("CLX lies outside the table stream")?;

    let plc = piece_table(clx)?;
    read_pieces(&word, plc, ccp_text)
}

/// Skip the property modifiers (Prc) and return the PlcPcd
fn piece_table(clx: &[u8]) -> Result<&[u8]> {
    let mut pos = 0;
    while pos < clx.len() {
        match clx[pos] {
            0x01 => {
                let cb = read_u16(clx, pos + 1).context("Truncated Prc in CLX")? as usize;
                pos += 3 + cb;
            }
            0x02 => {
                let lcb = read_u32(clx, pos + 1).context("Truncated Pcdt in CLX")? as usize;
                return clx
                    .get(pos + 5..pos + 5 + lcb)
                    .context("PlcPcd lies outside the CLX");
            }
            other => anyhow::bail!("Malformed piece table (unexpected CLX entry {:#04x})", other),
        }
    }
    anyhow::bail!("CLX has no piece table")
}

fn read_pieces(word: &[u8], plc: &[u8], ccp_text: usize) -> Result<String> {
    if plc.len() < 4 {
        anyhow::bail!("Empty piece table");
    }
    let pieces = (plc.len() - 4) / 12;
    let pcd_base = 4 * (pieces + 1);
    let mut text = String::new();

    for i in 0..pieces {
        let cp_start = read_u32(plc, 4 * i).context("Truncated piece table")? as usize;
        let cp_end = read_u32(plc, 4 * (i + 1)).context("Truncated piece table")? as usize;
        if cp_start >= ccp_text {
            break;
        }
        let len = cp_end.min(ccp_text).saturating_sub(cp_start);
        let fc = read_u32(plc, pcd_base + 8 * i + 2).context("Truncated piece descriptor")?;

        if fc & FC_COMPRESSED != 0 {
            let offset = ((fc & !FC_COMPRESSED) / 2) as usize;
            let bytes = word
                .get(offset..offset + len)
                .with_context(|| format!("Piece {} lies outside the WordDocument stream", i))?;
            text.push_str(&decode_cp1252(bytes));
        } else {
            let offset = fc as usize;
            let bytes = word
                .get(offset..offset + 2 * len)
                .with_context(|| format!("Piece {} lies outside the WordDocument stream", i))?;
            let units = bytes
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]));
            text.extend(char::decode_utf16(units).map(|r| r.unwrap_or('\u{FFFD}')));
        }
    }

    Ok(text)
}

/// Split raw document text on paragraph marks, dropping field codes and
/// control characters
fn split_paragraphs(text: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum Field {
        Instruction,
        Result,
    }

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut fields: Vec<Field> = Vec::new();
    let mut after_cell = false;

    for c in text.chars() {
        let in_instruction = fields.last() == Some(&Field::Instruction);
        match c {
            '\u{13}' => fields.push(Field::Instruction),
            '\u{14}' => {
                if let Some(top) = fields.last_mut() {
                    *top = Field::Result;
                }
            }
            '\u{15}' => {
                fields.pop();
            }
            _ if in_instruction => {}
            '\r' | '\u{0C}' => paragraphs.push(std::mem::take(&mut current)),
            '\u{07}' => {
                if after_cell {
                    // row end mark follows the last cell mark
                    if current.ends_with('\t') {
                        current.pop();
                    }
                    paragraphs.push(std::mem::take(&mut current));
                    after_cell = false;
                    continue;
                }
                current.push('\t');
                after_cell = true;
                continue;
            }
            '\u{0B}' => current.push('\n'),
            '\t' => current.push('\t'),
            '\u{1E}' => current.push('-'),
            c if c < ' ' => {}
            c => current.push(c),
        }
        after_cell = false;
    }
    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}
