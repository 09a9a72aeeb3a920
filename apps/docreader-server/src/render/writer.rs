//! PDF serialization of laid-out pages
//!
//! Built-in fonts are referenced as Type1 with WinAnsiEncoding. Unicode faces
//! are embedded whole as Type0/CIDFontType2 with Identity-H encoding, a
//! width array for the glyphs actually shown and a ToUnicode map so text
//! stays searchable and copyable.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{Datelike, Timelike, Utc};
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::convert::PageGeometry;
use crate::document::Rgb;
use crate::fonts::builtin::encode_winansi;
use crate::fonts::BuiltinFont;

use super::fonts::{EmbeddedFace, FontBook, FontKey, SYNTHETIC_ITALIC_SKEW};
use super::images::{ImageStream, PreparedImage};
use super::layout::{LaidOut, Op, Page};

const PRODUCER: &str = concat!("DocReader ", env!("CARGO_PKG_VERSION"));

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

fn font_resource_name(key: FontKey) -> String {
    match key {
        FontKey::Builtin(font) => format!("F{}", font as u8 + 1),
        FontKey::Embedded(index) => format!("U{}", index + 1),
    }
}

fn image_resource_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

/// Fonts and glyphs referenced by the page content
#[derive(Debug, Default)]
struct FontUsage {
    builtins: BTreeSet<BuiltinFont>,
    /// face index -> glyph id -> character it was shown for
    glyphs: BTreeMap<usize, BTreeMap<u16, char>>,
}

impl FontUsage {
    fn encode(&mut self, key: FontKey, text: &str, book: &FontBook) -> Result<Vec<u8>> {
        match key {
            FontKey::Builtin(font) => {
                self.builtins.insert(font);
                Ok(encode_winansi(text))
            }
            FontKey::Embedded(index) => {
                let face = book
                    .face(index)
                    .with_context(|| format!("No embedded face at index {}", index))?;
                let glyphs = self.glyphs.entry(index).or_default();
                let mut encoded = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let gid = face.glyph(c).unwrap_or(0);
                    if gid != 0 {
                        glyphs.entry(gid).or_insert(c);
                    }
                    encoded.extend_from_slice(&gid.to_be_bytes());
                }
                Ok(encoded)
            }
        }
    }
}

fn fill(content: &mut Content, color: Rgb) {
    let (r, g, b) = color.to_unit();
    content.set_fill_rgb(r, g, b);
}

fn stroke(content: &mut Content, color: Rgb) {
    let (r, g, b) = color.to_unit();
    content.set_stroke_rgb(r, g, b);
}

fn page_content(page: &Page, usage: &mut FontUsage, book: &FontBook) -> Result<Vec<u8>> {
    let mut content = Content::new();
    for op in &page.ops {
        match op {
            Op::Text {
                x,
                y,
                size,
                font,
                skew,
                color,
                text,
            } => {
                let encoded = usage.encode(*font, text, book)?;
                let shear = if *skew { SYNTHETIC_ITALIC_SKEW } else { 0.0 };
                let name = font_resource_name(*font);
                content.begin_text();
                fill(&mut content, *color);
                content.set_font(Name(name.as_bytes()), *size);
                content.set_text_matrix([1.0, 0.0, shear, 1.0, *x, *y]);
                content.show(Str(&encoded));
                content.end_text();
            }
            Op::Line {
                from,
                to,
                width,
                color,
            } => {
                stroke(&mut content, *color);
                content.set_line_width(*width);
                content.move_to(from.0, from.1);
                content.line_to(to.0, to.1);
                content.stroke();
            }
            Op::Rect {
                x,
                y,
                width,
                height,
                fill: fill_color,
                stroke: outline,
            } => {
                if let Some(color) = fill_color {
                    fill(&mut content, *color);
                }
                if let Some((color, line_width)) = outline {
                    stroke(&mut content, *color);
                    content.set_line_width(*line_width);
                }
                content.rect(*x, *y, *width, *height);
                match (fill_color.is_some(), outline.is_some()) {
                    (true, true) => content.fill_nonzero_and_stroke(),
                    (true, false) => content.fill_nonzero(),
                    (false, true) => content.stroke(),
                    (false, false) => content.end_path(),
                };
            }
            Op::Image {
                index,
                x,
                y,
                width,
                height,
            } => {
                let name = image_resource_name(*index);
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
        }
    }
    Ok(content.finish().to_vec())
}

fn write_embedded_font(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    face: &EmbeddedFace,
    glyphs: &BTreeMap<u16, char>,
) -> Ref {
    let type0_ref = alloc();
    let cid_ref = alloc();
    let descriptor_ref = alloc();
    let file_ref = alloc();
    let cmap_ref = alloc();
    let base_font = face.base_font_name();

    pdf.type0_font(type0_ref)
        .base_font(Name(base_font.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_ref)
        .to_unicode(cmap_ref);

    {
        let mut cid = pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2)
            .base_font(Name(base_font.as_bytes()))
            .system_info(identity_system_info())
            .font_descriptor(descriptor_ref)
            .default_width(0.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));
        let mut widths = cid.widths();
        for gid in glyphs.keys() {
            widths.consecutive(*gid, [face.glyph_width(*gid)]);
        }
    }

    let metrics = face.metrics();
    let mut flags = FontFlags::NON_SYMBOLIC;
    if face.is_italic() {
        flags |= FontFlags::ITALIC;
    }
    pdf.font_descriptor(descriptor_ref)
        .name(Name(base_font.as_bytes()))
        .flags(flags)
        .bbox(Rect::new(
            metrics.bbox[0],
            metrics.bbox[1],
            metrics.bbox[2],
            metrics.bbox[3],
        ))
        .italic_angle(if face.is_italic() { -12.0 } else { 0.0 })
        .ascent(metrics.ascent)
        .descent(metrics.descent)
        .cap_height(metrics.cap_height)
        .stem_v(if face.is_bold() { 120.0 } else { 80.0 })
        .font_file2(file_ref);

    let program = face.font.data.as_slice();
    let compressed = compress_to_vec_zlib(program, 6);
    pdf.stream(file_ref, &compressed)
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), program.len() as i32);

    let mut cmap = UnicodeCmap::new(Name(b"Custom"), identity_system_info());
    for (gid, c) in glyphs {
        cmap.pair(*gid, *c);
    }
    pdf.cmap(cmap_ref, &cmap.finish());

    type0_ref
}

fn write_image(pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, image: &PreparedImage) -> Ref {
    let image_ref = alloc();
    let (width, height) = (image.width as i32, image.height as i32);
    match &image.stream {
        ImageStream::Jpeg { data, gray } => {
            let mut xobj = pdf.image_xobject(image_ref, data);
            xobj.filter(Filter::DctDecode);
            xobj.width(width);
            xobj.height(height);
            if *gray {
                xobj.color_space().device_gray();
            } else {
                xobj.color_space().device_rgb();
            }
            xobj.bits_per_component(8);
        }
        ImageStream::Flate { rgb, alpha } => {
            let mask_ref = alpha.as_ref().map(|alpha| {
                let mask_ref = alloc();
                let mut mask = pdf.image_xobject(mask_ref, alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(width);
                mask.height(height);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask_ref
            });
            let mut xobj = pdf.image_xobject(image_ref, rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(width);
            xobj.height(height);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = mask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    image_ref
}

fn creation_date() -> Date {
    let now = Utc::now();
    Date::new(now.year().clamp(0, 9999) as u16)
        .month(now.month() as u8)
        .day(now.day() as u8)
        .hour(now.hour() as u8)
        .minute(now.minute() as u8)
        .second(now.second() as u8)
        .utc_offset_hour(0)
}

/// Serialize laid-out pages into a complete PDF file
pub fn write(laid: &LaidOut, geometry: &PageGeometry, book: &FontBook) -> Result<Vec<u8>> {
    let mut pdf = Pdf::new();
    let mut next_ref = Ref::new(1);
    let mut alloc = move || next_ref.bump();

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let page_ids: Vec<Ref> = laid.pages.iter().map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = laid.pages.iter().map(|_| alloc()).collect();

    let mut usage = FontUsage::default();
    for (page, content_id) in laid.pages.iter().zip(&content_ids) {
        let raw = page_content(page, &mut usage, book)?;
        let compressed = compress_to_vec_zlib(&raw, 6);
        pdf.stream(*content_id, &compressed)
            .filter(Filter::FlateDecode);
    }

    let mut font_refs: Vec<(String, Ref)> = Vec::new();
    for font in &usage.builtins {
        let font_ref = alloc();
        pdf.type1_font(font_ref)
            .base_font(Name(font.base_font_name().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        font_refs.push((font_resource_name(FontKey::Builtin(*font)), font_ref));
    }
    for (index, glyphs) in &usage.glyphs {
        let face = book
            .face(*index)
            .with_context(|| format!("No embedded face at index {}", index))?;
        let font_ref = write_embedded_font(&mut pdf, &mut alloc, face, glyphs);
        font_refs.push((font_resource_name(FontKey::Embedded(*index)), font_ref));
    }

    let image_refs: Vec<(String, Ref)> = laid
        .images
        .iter()
        .enumerate()
        .map(|(i, image)| (image_resource_name(i), write_image(&mut pdf, &mut alloc, image)))
        .collect();

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    for (page_id, content_id) in page_ids.iter().zip(&content_ids) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(pages_id)
            .contents(*content_id);
        let mut resources = page.resources();
        {
            let mut fonts = resources.fonts();
            for (name, font_ref) in &font_refs {
                fonts.pair(Name(name.as_bytes()), *font_ref);
            }
        }
        if !image_refs.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, image_ref) in &image_refs {
                xobjects.pair(Name(name.as_bytes()), *image_ref);
            }
        }
    }

    pdf.document_info(info_id)
        .producer(TextStr(PRODUCER))
        .creation_date(creation_date());

    tracing::debug!(
        "Wrote {} page(s): {} built-in font(s), {} embedded face(s), {} image(s)",
        page_ids.len(),
        usage.builtins.len(),
        usage.glyphs.len(),
        image_refs.len()
    );

    Ok(pdf.finish())
}
