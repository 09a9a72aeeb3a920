//! Base-14 fallback fonts
//!
//! Every PDF reader ships Helvetica and Courier, so these are the last link of
//! every font chain. They are written with WinAnsiEncoding; characters outside
//! that code page become `?`.

/// Built-in PDF fonts used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
}

impl BuiltinFont {
    /// Pick the Helvetica (or Courier for code) variant for a style
    pub fn select(bold: bool, italic: bool, code: bool) -> Self {
        match (code, bold, italic) {
            (true, true, _) => BuiltinFont::CourierBold,
            (true, false, _) => BuiltinFont::Courier,
            (false, true, true) => BuiltinFont::HelveticaBoldOblique,
            (false, true, false) => BuiltinFont::HelveticaBold,
            (false, false, true) => BuiltinFont::HelveticaOblique,
            (false, false, false) => BuiltinFont::Helvetica,
        }
    }

    /// PostScript name written to `/BaseFont`
    pub fn base_font_name(self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
            BuiltinFont::HelveticaOblique => "Helvetica-Oblique",
            BuiltinFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            BuiltinFont::Courier => "Courier",
            BuiltinFont::CourierBold => "Courier-Bold",
        }
    }

    pub fn is_monospace(self) -> bool {
        matches!(self, BuiltinFont::Courier | BuiltinFont::CourierBold)
    }

    fn is_bold(self) -> bool {
        matches!(
            self,
            BuiltinFont::HelveticaBold | BuiltinFont::HelveticaBoldOblique | BuiltinFont::CourierBold
        )
    }

    /// Advance width in 1/1000 em for the character as it will be written
    /// (unencodable characters measure as `?`)
    pub fn char_width(self, c: char) -> u16 {
        if self.is_monospace() {
            return 600;
        }
        let c = if winansi_byte(c).is_some() { c } else { '?' };
        let table = if self.is_bold() {
            &HELVETICA_BOLD_ASCII
        } else {
            &HELVETICA_ASCII
        };

        match c as u32 {
            0x20..=0x7E => table[(c as u32 - 0x20) as usize],
            _ => latin_width(c, table, self.is_bold()),
        }
    }

    /// Width of a string in points at the given size
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c) as f32).sum::<f32>() * size / 1000.0
    }

    /// Ascender and descender in 1/1000 em
    pub fn vertical_metrics(self) -> (i16, i16) {
        if self.is_monospace() {
            (629, -157)
        } else {
            (718, -207)
        }
    }
}

/// Helvetica widths for 0x20..=0x7E
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Helvetica-Bold widths for 0x20..=0x7E
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

fn ascii_width(table: &[u16; 95], c: char) -> u16 {
    table[(c as u32 - 0x20) as usize]
}

/// Upper half of WinAnsi: accented letters measure like their base letter
fn latin_width(c: char, table: &[u16; 95], bold: bool) -> u16 {
    let base = match c {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ð' => 'D',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' | 'Ÿ' => 'Y',
        'Þ' => 'P',
        'Š' => 'S',
        'Ž' => 'Z',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ð' | 'ò'..='ö' | 'ø' => 'o',
        'ñ' => 'n',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'þ' => 'p',
        'š' => 's',
        'ž' => 'z',
        '\u{A0}' => ' ',
        _ => {
            return match c {
                'Æ' | '—' | '…' | '‰' | '™' | 'Œ' => 1000,
                'æ' | 'œ' => {
                    if bold {
                        889
                    } else {
                        944
                    }
                }
                'ß' => 611,
                '•' => 350,
                '‘' | '’' | '‚' => 222,
                '“' | '”' | '„' => 333,
                '×' | '÷' | '±' | '¬' => 584,
                '©' | '®' => 737,
                '°' => 400,
                '‹' | '›' => 333,
                _ => 556,
            };
        }
    };
    // accented i glyphs carry the dotless i width
    if base == 'i' {
        return 278;
    }
    ascii_width(table, base)
}

/// cp1252 code points 0x80..=0x9F; undefined slots map to U+FFFD
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ',
    '\u{FFFD}', 'ž', 'Ÿ',
];

/// Decode one Windows-1252 byte
pub fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => CP1252_HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// Decode a Windows-1252 byte string
pub fn decode_cp1252(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| cp1252_char(b)).collect()
}

/// WinAnsi code for a character, if it has one
pub fn winansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        0x80..=0x9F => None,
        _ if c == '\u{FFFD}' => None,
        _ => CP1252_HIGH
            .iter()
            .position(|&h| h == c)
            .map(|i| 0x80 + i as u8),
    }
}

/// Encode text for a built-in font; unencodable characters become `?`
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| winansi_byte(c).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp1252_round_trip() {
        for byte in (0x20u8..=0x7E).chain(0xA0..=0xFF) {
            assert_eq!(winansi_byte(cp1252_char(byte)), Some(byte));
        }
        assert_eq!(cp1252_char(0x80), '€');
        assert_eq!(winansi_byte('€'), Some(0x80));
        assert_eq!(winansi_byte('“'), Some(0x93));
        assert_eq!(cp1252_char(0x81), '\u{FFFD}');
    }

    #[test]
    fn test_encode_winansi_substitutes() {
        assert_eq!(encode_winansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_winansi("Ωx"), b"?x".to_vec());
        assert_eq!(encode_winansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_widths() {
        assert_eq!(BuiltinFont::Helvetica.char_width('A'), 667);
        assert_eq!(BuiltinFont::HelveticaBold.char_width('a'), 556);
        assert_eq!(BuiltinFont::Courier.char_width('W'), 600);
        assert_eq!(BuiltinFont::Helvetica.char_width('é'), 556);
        // unencodable measures as the substitution mark
        assert_eq!(
            BuiltinFont::Helvetica.char_width('日'),
            BuiltinFont::Helvetica.char_width('?')
        );
        let width = BuiltinFont::Helvetica.text_width("ii", 10.0);
        assert!((width - 4.44).abs() < 0.01);
    }

    #[test]
    fn test_select() {
        assert_eq!(BuiltinFont::select(true, true, false), BuiltinFont::HelveticaBoldOblique);
        assert_eq!(BuiltinFont::select(false, true, true), BuiltinFont::Courier);
        assert_eq!(BuiltinFont::select(true, false, true).base_font_name(), "Courier-Bold");
    }
}
