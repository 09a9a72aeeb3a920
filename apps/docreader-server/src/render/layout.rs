//! Page layout
//!
//! Flows the document model top to bottom through the content box of each
//! page, wrapping text greedily at word boundaries. The output is a list of
//! positioned drawing operations per page; PDF encoding happens later in
//! [`super::writer`].

use std::mem;

use crate::convert::PageGeometry;
use crate::document::{
    Block, Document, ImageData, Paragraph, ParagraphKind, Rgb, Run, RunStyle, Table, VerticalAlign,
};

use super::fonts::{FontBook, FontKey};
use super::images::{self, PreparedImage};

pub const PLACEHOLDER_TEXT: &str =
    "Document appears to be empty or contains no readable content.";

const HEADING_BLUE: Rgb = Rgb(0x36, 0x5F, 0x91);
const ACCENT_BLUE: Rgb = Rgb(0x4F, 0x81, 0xBD);
const TABLE_HEADER_FILL: Rgb = Rgb(0xDB, 0xE5, 0xF1);
const GRID_GREY: Rgb = Rgb(0xCC, 0xCC, 0xCC);
const RULE_GREY: Rgb = Rgb(0x80, 0x80, 0x80);

/// 7in
const MAX_IMAGE_WIDTH: f32 = 504.0;
/// 0.15in, used for empty paragraphs and after tables
const SPACER_HEIGHT: f32 = 10.8;
const IMAGE_SPACE_AFTER: f32 = 7.2;
const TAB_STOP: f32 = 36.0;
const CODE_SIZE: f32 = 9.0;

const TABLE_FONT_SIZE: f32 = 9.0;
const TABLE_LEADING: f32 = 10.8;
const CELL_PAD_X: f32 = 6.0;
const CELL_PAD_TOP: f32 = 4.0;
const CELL_PAD_BOTTOM: f32 = 3.0;
const HEADER_PAD_BOTTOM: f32 = 8.0;
const MIN_COLUMN_WIDTH: f32 = 24.0;
const GRID_WIDTH: f32 = 0.5;

const RULE_WIDTH: f32 = 0.5;
const RULE_SPACE_BEFORE: f32 = 3.0;
const RULE_SPACE_AFTER: f32 = 6.0;

const MAX_LIST_DEPTH: usize = 3;

/// Paragraph-level metrics in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStyle {
    pub size: f32,
    pub leading: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub indent: f32,
    pub color: Rgb,
    pub bold: bool,
}

impl BlockStyle {
    pub fn normal() -> Self {
        Self {
            size: 10.0,
            leading: 12.0,
            space_before: 0.0,
            space_after: 6.0,
            indent: 0.0,
            color: Rgb::BLACK,
            bold: false,
        }
    }

    pub fn heading(level: u8) -> Self {
        let (size, leading, space_before, space_after, color) = match level {
            0 | 1 => (14.0, 18.0, 10.0, 6.0, HEADING_BLUE),
            2 => (12.0, 15.0, 8.0, 4.0, ACCENT_BLUE),
            _ => (11.0, 14.0, 6.0, 3.0, ACCENT_BLUE),
        };
        Self {
            size,
            leading,
            space_before,
            space_after,
            indent: 0.0,
            color,
            bold: true,
        }
    }

    pub fn list_item(level: u8) -> Self {
        Self {
            space_after: 3.0,
            indent: if level == 0 { 18.0 } else { 36.0 },
            ..Self::normal()
        }
    }

    pub fn for_kind(kind: ParagraphKind) -> Self {
        match kind {
            ParagraphKind::Normal => Self::normal(),
            ParagraphKind::Heading(level) => Self::heading(level),
            ParagraphKind::ListItem { level, .. } => Self::list_item(level),
        }
    }
}

/// A positioned drawing operation; coordinates are PDF user space
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: FontKey,
        skew: bool,
        color: Rgb,
        text: String,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgb,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<(Rgb, f32)>,
    },
    /// Draws `images[index]` scaled into the box
    Image {
        index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub ops: Vec<Op>,
}

#[derive(Debug, Default)]
pub struct LaidOut {
    pub pages: Vec<Page>,
    pub images: Vec<PreparedImage>,
}

/// Character formatting after block defaults are applied
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpanStyle {
    size: f32,
    rise: f32,
    bold: bool,
    italic: bool,
    code: bool,
    underline: bool,
    strike: bool,
    color: Rgb,
}

impl SpanStyle {
    fn resolve(run: &RunStyle, block: &BlockStyle) -> Self {
        let base = if run.code { CODE_SIZE } else { block.size };
        let (size, rise) = match run.vertical {
            VerticalAlign::Baseline => (base, 0.0),
            VerticalAlign::Superscript => (base * 0.7, base * 0.35),
            VerticalAlign::Subscript => (base * 0.7, -base * 0.15),
        };
        Self {
            size,
            rise,
            bold: block.bold || run.bold,
            italic: run.italic,
            code: run.code,
            underline: run.underline,
            strike: run.strike,
            color: run.color.unwrap_or(block.color),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    c: char,
    font: FontKey,
    skew: bool,
    width: f32,
    style: SpanStyle,
}

#[derive(Debug, Clone, Copy)]
enum Item {
    Glyph(Glyph),
    Tab,
    Break,
}

#[derive(Debug, Clone, Copy)]
struct Placed {
    x: f32,
    glyph: Glyph,
}

type Line = Vec<Placed>;

fn is_space(c: char) -> bool {
    c == ' '
}

fn shape(runs: &[Run], block: &BlockStyle, book: &FontBook) -> Vec<Item> {
    let mut items = Vec::new();
    for run in runs {
        let style = SpanStyle::resolve(&run.style, block);
        for c in run.text.chars() {
            match c {
                '\n' => items.push(Item::Break),
                '\t' => items.push(Item::Tab),
                '\r' => {}
                c if c.is_control() => {}
                c => {
                    let (font, skew) = book.pick(c, style.bold, style.italic, style.code);
                    items.push(Item::Glyph(Glyph {
                        c,
                        font,
                        skew,
                        width: book.char_width(font, c, style.size),
                        style,
                    }));
                }
            }
        }
    }
    items
}

fn finish_line(lines: &mut Vec<Line>, line: &mut Line) {
    while line.last().is_some_and(|p| is_space(p.glyph.c)) {
        line.pop();
    }
    lines.push(mem::take(line));
}

/// Greedy line breaking; always yields at least one (possibly empty) line
fn break_lines(items: &[Item], width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line: Line = Vec::new();
    let mut x = 0.0;
    let mut i = 0;

    while i < items.len() {
        match items[i] {
            Item::Break => {
                finish_line(&mut lines, &mut line);
                x = 0.0;
                i += 1;
            }
            Item::Tab => {
                let mut advance = TAB_STOP - (x % TAB_STOP);
                if advance < 1.0 {
                    advance += TAB_STOP;
                }
                if x + advance > width && x > 0.0 {
                    finish_line(&mut lines, &mut line);
                    x = 0.0;
                } else {
                    x += advance;
                }
                i += 1;
            }
            Item::Glyph(glyph) if is_space(glyph.c) => {
                if !line.is_empty() {
                    line.push(Placed { x, glyph });
                    x += glyph.width;
                }
                i += 1;
            }
            Item::Glyph(_) => {
                let end = items[i..]
                    .iter()
                    .position(|item| match item {
                        Item::Glyph(g) => is_space(g.c),
                        _ => true,
                    })
                    .map(|n| i + n)
                    .unwrap_or(items.len());
                let word: Vec<Glyph> = items[i..end]
                    .iter()
                    .filter_map(|item| match item {
                        Item::Glyph(g) => Some(*g),
                        _ => None,
                    })
                    .collect();
                let word_width: f32 = word.iter().map(|g| g.width).sum();

                if x + word_width > width && x > 0.0 {
                    finish_line(&mut lines, &mut line);
                    x = 0.0;
                }
                for glyph in word {
                    if word_width > width && x + glyph.width > width && x > 0.0 {
                        finish_line(&mut lines, &mut line);
                        x = 0.0;
                    }
                    line.push(Placed { x, glyph });
                    x += glyph.width;
                }
                i = end;
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        finish_line(&mut lines, &mut line);
    }
    lines
}

fn line_width(line: &Line) -> f32 {
    line.last().map(|p| p.x + p.glyph.width).unwrap_or(0.0)
}

/// Emit text and decoration ops for one line at the given origin
fn emit_line(ops: &mut Vec<Op>, line: &Line, x0: f32, baseline: f32) {
    let mut start = 0;
    while start < line.len() {
        let first = line[start];
        let mut end = start + 1;
        let mut cursor = first.x + first.glyph.width;
        while end < line.len() {
            let next = line[end];
            let same_run = next.glyph.font == first.glyph.font
                && next.glyph.skew == first.glyph.skew
                && next.glyph.style == first.glyph.style
                && (next.x - cursor).abs() < 0.01;
            if !same_run {
                break;
            }
            cursor = next.x + next.glyph.width;
            end += 1;
        }

        let style = first.glyph.style;
        let x = x0 + first.x;
        let y = baseline + style.rise;
        let text: String = line[start..end].iter().map(|p| p.glyph.c).collect();
        ops.push(Op::Text {
            x,
            y,
            size: style.size,
            font: first.glyph.font,
            skew: first.glyph.skew,
            color: style.color,
            text,
        });

        let decoration_width = (style.size * 0.05).max(0.5);
        if style.underline {
            let dy = y - style.size * 0.12;
            ops.push(Op::Line {
                from: (x, dy),
                to: (x0 + cursor, dy),
                width: decoration_width,
                color: style.color,
            });
        }
        if style.strike {
            let dy = y + style.size * 0.3;
            ops.push(Op::Line {
                from: (x, dy),
                to: (x0 + cursor, dy),
                width: decoration_width,
                color: style.color,
            });
        }
        start = end;
    }
}

/// Numbering state for ordered lists
#[derive(Debug, Default)]
struct ListCounters {
    counters: [u32; MAX_LIST_DEPTH],
    last_level: Option<usize>,
}

impl ListCounters {
    /// Label for a list item, advancing the counters for ordered items
    fn label(&mut self, ordered: bool, level: u8) -> String {
        let level = (level as usize).min(MAX_LIST_DEPTH - 1);
        if !ordered {
            self.last_level = Some(level);
            return "\u{2022} ".to_string();
        }
        if self.last_level.is_some_and(|last| level <= last) {
            for deeper in &mut self.counters[level + 1..] {
                *deeper = 0;
            }
        }
        self.counters[level] += 1;
        self.last_level = Some(level);
        format!("{}. ", self.counters[level])
    }

    fn heading(&mut self) {
        self.last_level = None;
    }

    fn normal(&mut self) {
        self.last_level = None;
        self.counters = [0; MAX_LIST_DEPTH];
    }
}

struct Layout<'a, 'f> {
    geometry: &'a PageGeometry,
    book: &'a FontBook<'f>,
    pages: Vec<Page>,
    images: Vec<PreparedImage>,
    ops: Vec<Op>,
    y: f32,
    lists: ListCounters,
}

impl<'a, 'f> Layout<'a, 'f> {
    fn new(geometry: &'a PageGeometry, book: &'a FontBook<'f>) -> Self {
        Self {
            geometry,
            book,
            pages: Vec::new(),
            images: Vec::new(),
            ops: Vec::new(),
            y: geometry.height - geometry.margin,
            lists: ListCounters::default(),
        }
    }

    fn top(&self) -> f32 {
        self.geometry.height - self.geometry.margin
    }

    fn bottom(&self) -> f32 {
        self.geometry.margin
    }

    fn left(&self) -> f32 {
        self.geometry.margin
    }

    fn at_top(&self) -> bool {
        (self.y - self.top()).abs() < 0.01
    }

    fn new_page(&mut self) {
        self.pages.push(Page {
            ops: mem::take(&mut self.ops),
        });
        self.y = self.top();
    }

    /// Start a new page unless `height` still fits
    fn ensure(&mut self, height: f32) {
        if self.y - height < self.bottom() && !self.at_top() {
            self.new_page();
        }
    }

    fn space_before(&mut self, amount: f32) {
        if !self.at_top() {
            self.y -= amount;
        }
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Paragraph(paragraph) => self.paragraph(paragraph),
            Block::Table(table) => self.table(table),
            Block::Image(image) => self.image(image),
            Block::Rule => self.rule(),
            Block::Spacer => self.spacer(),
        }
    }

    fn paragraph(&mut self, paragraph: &Paragraph) {
        let style = BlockStyle::for_kind(paragraph.kind);
        let label = match paragraph.kind {
            ParagraphKind::Normal => {
                self.lists.normal();
                None
            }
            ParagraphKind::Heading(_) => {
                self.lists.heading();
                None
            }
            ParagraphKind::ListItem { ordered, level } => Some(self.lists.label(ordered, level)),
        };

        if paragraph.is_blank() && label.is_none() {
            self.spacer();
            return;
        }

        let mut runs = Vec::with_capacity(paragraph.runs.len() + 1);
        if let Some(label) = label {
            runs.push(Run::plain(label));
        }
        runs.extend(paragraph.runs.iter().cloned());

        let items = shape(&runs, &style, self.book);
        let lines = break_lines(&items, self.geometry.content_width() - style.indent);

        self.space_before(style.space_before);
        let x0 = self.left() + style.indent;
        for line in &lines {
            self.ensure(style.leading);
            let baseline = self.y - style.leading * 0.8;
            emit_line(&mut self.ops, line, x0, baseline);
            self.y -= style.leading;
        }
        self.y -= style.space_after;
    }

    fn table(&mut self, table: &Table) {
        let columns = table.column_count();
        if columns == 0 {
            return;
        }
        let body = BlockStyle {
            size: TABLE_FONT_SIZE,
            leading: TABLE_LEADING,
            ..BlockStyle::normal()
        };
        let header = BlockStyle {
            color: HEADING_BLUE,
            bold: true,
            ..body
        };

        let shaped: Vec<Vec<Vec<Item>>> = table
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let style = if r == 0 { &header } else { &body };
                (0..columns)
                    .map(|c| {
                        let text = row.get(c).map(String::as_str).unwrap_or("");
                        shape(&[Run::plain(text.trim())], style, self.book)
                    })
                    .collect()
            })
            .collect();

        let widths = column_widths(&shaped, columns, self.geometry.content_width());
        let max_lines = ((self.geometry.content_height() - CELL_PAD_TOP - HEADER_PAD_BOTTOM)
            / TABLE_LEADING)
            .floor()
            .max(1.0) as usize;

        for (r, row) in shaped.iter().enumerate() {
            let pad_bottom = if r == 0 { HEADER_PAD_BOTTOM } else { CELL_PAD_BOTTOM };
            let cells: Vec<Vec<Line>> = row
                .iter()
                .zip(&widths)
                .map(|(items, width)| {
                    let mut lines = break_lines(items, width - 2.0 * CELL_PAD_X);
                    lines.truncate(max_lines);
                    lines
                })
                .collect();
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1);
            let height = CELL_PAD_TOP + line_count as f32 * TABLE_LEADING + pad_bottom;

            self.ensure(height);
            let row_top = self.y;
            let mut x = self.left();
            for (lines, width) in cells.iter().zip(&widths) {
                self.ops.push(Op::Rect {
                    x,
                    y: row_top - height,
                    width: *width,
                    height,
                    fill: (r == 0).then_some(TABLE_HEADER_FILL),
                    stroke: Some((GRID_GREY, GRID_WIDTH)),
                });
                let mut line_top = row_top - CELL_PAD_TOP;
                for line in lines {
                    emit_line(
                        &mut self.ops,
                        line,
                        x + CELL_PAD_X,
                        line_top - TABLE_LEADING * 0.8,
                    );
                    line_top -= TABLE_LEADING;
                }
                x += width;
            }
            self.y -= height;
        }
        self.y -= SPACER_HEIGHT;
    }

    fn image(&mut self, data: &ImageData) {
        let prepared = match images::prepare(&data.bytes) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::debug!("Skipping image {}: {:#}", data.name, e);
                return;
            }
        };

        let mut width = prepared.width as f32;
        let mut height = prepared.height as f32;
        let max_width = MAX_IMAGE_WIDTH.min(self.geometry.content_width());
        if width > max_width {
            height *= max_width / width;
            width = max_width;
        }
        let max_height = self.geometry.content_height();
        if height > max_height {
            width *= max_height / height;
            height = max_height;
        }

        self.ensure(height);
        let index = self.images.len();
        self.images.push(prepared);
        self.ops.push(Op::Image {
            index,
            x: self.left(),
            y: self.y - height,
            width,
            height,
        });
        self.y -= height + IMAGE_SPACE_AFTER;
    }

    fn rule(&mut self) {
        self.space_before(RULE_SPACE_BEFORE);
        self.ensure(RULE_WIDTH);
        let y = self.y - RULE_WIDTH / 2.0;
        self.ops.push(Op::Line {
            from: (self.left(), y),
            to: (self.left() + self.geometry.content_width(), y),
            width: RULE_WIDTH,
            color: RULE_GREY,
        });
        self.y -= RULE_WIDTH + RULE_SPACE_AFTER;
    }

    fn spacer(&mut self) {
        if self.y - SPACER_HEIGHT >= self.bottom() {
            self.y -= SPACER_HEIGHT;
        }
    }

    fn finish(mut self) -> LaidOut {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        LaidOut {
            pages: self.pages,
            images: self.images,
        }
    }
}

/// Natural column widths, scaled down proportionally to fit `available`
fn column_widths(rows: &[Vec<Vec<Item>>], columns: usize, available: f32) -> Vec<f32> {
    let mut natural = vec![MIN_COLUMN_WIDTH; columns];
    for row in rows {
        for (c, items) in row.iter().enumerate() {
            let widest = break_lines(items, f32::INFINITY)
                .iter()
                .map(line_width)
                .fold(0.0, f32::max);
            natural[c] = natural[c].max(widest + 2.0 * CELL_PAD_X);
        }
    }
    let total: f32 = natural.iter().sum();
    if total <= available {
        return natural;
    }
    let floor = MIN_COLUMN_WIDTH.min(available / columns as f32);
    let flexible: f32 = natural.iter().map(|w| w - floor).sum();
    let spare = available - floor * columns as f32;
    natural
        .iter()
        .map(|w| floor + (w - floor) * spare / flexible.max(f32::EPSILON))
        .collect()
}

/// Lay out a document; an empty document yields a single placeholder page
pub fn layout(document: &Document, geometry: &PageGeometry, book: &FontBook) -> LaidOut {
    let mut layout = Layout::new(geometry, book);
    if document.is_empty() {
        layout.paragraph(&Paragraph::new(
            ParagraphKind::Normal,
            vec![Run::plain(PLACEHOLDER_TEXT)],
        ));
    } else {
        for block in &document.blocks {
            layout.block(block);
        }
    }
    layout.finish()
}
