//! DOCX (Office Open XML) strategy
//!
//! Reads `word/document.xml` from the ZIP container and walks the body in
//! document order. Style names come from `word/styles.xml`, images are
//! looked up through `word/_rels/document.xml.rels`.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use zip::result::ZipError;
use zip::ZipArchive;

use super::xml::XmlNode;
use super::DocumentFormat;
use crate::convert::Converter;
use crate::document::{
    Block, Document, ImageData, Paragraph, ParagraphKind, Rgb, Run, RunStyle, Table,
    VerticalAlign,
};

/// Left indent (twips) past which a list item counts as nested
const NESTED_INDENT_TWIPS: i64 = 720;

const CODE_STYLE_HINTS: &[&str] = &["code", "verbatim", "mono", "console"];
const CODE_FONT_HINTS: &[&str] = &["courier", "consolas", "mono", "code"];

pub struct DocxConverter;

impl Converter for DocxConverter {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn parse(&self, bytes: &[u8]) -> Result<Document> {
        parse_docx(bytes).context("DOCX to PDF conversion error")
    }
}

struct Package {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl Package {
    fn open(bytes: &[u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec()))
            .context("File is not a valid DOCX (ZIP) package")?;
        Ok(Self { archive })
    }

    /// Read a part; `None` when the package does not contain it
    fn part(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to open part {}", name)),
        };
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .with_context(|| format!("Failed to read part {}", name))?;
        Ok(Some(content))
    }

    fn xml_part(&mut self, name: &str) -> Result<Option<XmlNode>> {
        match self.part(name)? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let text = text.trim_start_matches('\u{feff}');
                XmlNode::parse(text)
                    .with_context(|| format!("Failed to parse {}", name))
                    .map(Some)
            }
            None => Ok(None),
        }
    }
}

fn parse_docx(bytes: &[u8]) -> Result<Document> {
    let mut package = Package::open(bytes)?;

    let root = package
        .xml_part("word/document.xml")?
        .context("Package has no word/document.xml")?;
    let styles = match package.xml_part("word/styles.xml") {
        Ok(Some(node)) => StyleNames::from_styles(&node),
        Ok(None) => StyleNames::default(),
        Err(e) => {
            tracing::debug!("Ignoring unreadable styles: {:#}", e);
            StyleNames::default()
        }
    };
    let rels = match package.xml_part("word/_rels/document.xml.rels") {
        Ok(Some(node)) => Relationships::from_rels(&node),
        _ => Relationships::default(),
    };

    let body = root.child("w:body").context("word/document.xml has no body")?;

    let mut builder = BodyBuilder {
        styles: &styles,
        rels: &rels,
        package: &mut package,
        document: Document::default(),
        paragraphs: 0,
        tables: 0,
    };
    builder.walk(body);

    tracing::debug!(
        "Processed {} paragraphs, {} tables in document order",
        builder.paragraphs,
        builder.tables
    );

    Ok(builder.document)
}

/// styleId -> display name
#[derive(Default)]
struct StyleNames(HashMap<String, String>);

impl StyleNames {
    fn from_styles(root: &XmlNode) -> Self {
        let map = root
            .children_named("w:style")
            .filter_map(|style| {
                let id = style.attr("w:styleId")?;
                let name = style
                    .child("w:name")
                    .and_then(|n| n.attr("w:val"))
                    .unwrap_or(id);
                Some((id.to_string(), name.to_string()))
            })
            .collect();
        Self(map)
    }

    /// Lowercase display name for a style id (the id itself when undeclared)
    fn name(&self, id: &str) -> String {
        self.0.get(id).map(String::as_str).unwrap_or(id).to_lowercase()
    }
}

/// rId -> part name inside the package
#[derive(Default)]
struct Relationships(HashMap<String, String>);

impl Relationships {
    fn from_rels(root: &XmlNode) -> Self {
        let map = root
            .children_named("Relationship")
            .filter(|r| r.attr("TargetMode") != Some("External"))
            .filter_map(|r| {
                let id = r.attr("Id")?;
                let target = r.attr("Target")?;
                Some((id.to_string(), resolve_target(target)))
            })
            .collect();
        Self(map)
    }

    fn target(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }
}

/// Relationship targets are relative to `word/` unless absolute
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn is_on(node: Option<&XmlNode>) -> bool {
    match node {
        Some(n) => !matches!(n.attr("w:val"), Some("0") | Some("false") | Some("off")),
        None => false,
    }
}

struct BodyBuilder<'a> {
    styles: &'a StyleNames,
    rels: &'a Relationships,
    package: &'a mut Package,
    document: Document,
    paragraphs: usize,
    tables: usize,
}

impl BodyBuilder<'_> {
    fn walk(&mut self, container: &XmlNode) {
        for element in &container.children {
            match element.name.as_str() {
                "w:p" => {
                    self.paragraphs += 1;
                    self.paragraph_element(element);
                }
                "w:tbl" => {
                    self.tables += 1;
                    if let Some(table) = table(element) {
                        self.document.push(Block::Table(table));
                    }
                }
                "w:sdt" => {
                    if let Some(content) = element.child("w:sdtContent") {
                        self.walk(content);
                    }
                }
                _ => {}
            }
        }
    }

    fn paragraph_element(&mut self, element: &XmlNode) {
        let drawings: Vec<&XmlNode> = element
            .descendants("w:drawing")
            .into_iter()
            .chain(element.descendants("w:pict"))
            .collect();

        if drawings.is_empty() {
            let block = self.paragraph(element);
            self.document.push(block);
            return;
        }

        if !paragraph_text(element).trim().is_empty() {
            let block = self.paragraph(element);
            self.document.push(block);
        }
        for drawing in drawings {
            match self.image(drawing) {
                Some(image) => self.document.push(Block::Image(image)),
                None => tracing::debug!("Skipping drawing without an embedded image"),
            }
        }
    }

    fn paragraph(&self, element: &XmlNode) -> Block {
        let ppr = element.child("w:pPr");
        let text = paragraph_text(element);

        if text.trim().is_empty() {
            let bordered = ppr
                .and_then(|p| p.child("w:pBdr"))
                .map(|b| b.child("w:top").is_some() || b.child("w:bottom").is_some())
                .unwrap_or(false);
            return if bordered { Block::Rule } else { Block::Spacer };
        }

        let style_name = ppr
            .and_then(|p| p.child("w:pStyle"))
            .and_then(|s| s.attr("w:val"))
            .map(|id| self.styles.name(id))
            .unwrap_or_default();

        let kind = if let Some(level) = heading_level(&style_name) {
            ParagraphKind::Heading(level)
        } else if let Some((ordered, level)) = list_info(&style_name, ppr) {
            ParagraphKind::ListItem { ordered, level }
        } else {
            ParagraphKind::Normal
        };

        let runs = self.runs(element);
        Block::Paragraph(Paragraph::new(kind, runs).trim())
    }

    fn runs(&self, container: &XmlNode) -> Vec<Run> {
        let mut runs = Vec::new();
        for child in &container.children {
            match child.name.as_str() {
                "w:r" => {
                    if let Some(run) = self.run(child) {
                        runs.push(run);
                    }
                }
                "w:hyperlink" | "w:ins" | "w:smartTag" | "w:fldSimple" | "w:customXml" => {
                    runs.extend(self.runs(child));
                }
                _ => {}
            }
        }
        runs
    }

    fn run(&self, element: &XmlNode) -> Option<Run> {
        let text = run_text(element);
        if text.is_empty() {
            return None;
        }

        let rpr = element.child("w:rPr");
        if self.is_code_run(rpr) {
            return Some(Run::styled(
                text,
                RunStyle {
                    code: true,
                    ..Default::default()
                },
            ));
        }

        let Some(rpr) = rpr else {
            return Some(Run::plain(text));
        };
        let underline = rpr
            .child("w:u")
            .map(|u| u.attr("w:val") != Some("none"))
            .unwrap_or(false);
        let vertical = match rpr.child("w:vertAlign").and_then(|v| v.attr("w:val")) {
            Some("superscript") => VerticalAlign::Superscript,
            Some("subscript") => VerticalAlign::Subscript,
            _ => VerticalAlign::Baseline,
        };
        let color = rpr
            .child("w:color")
            .and_then(|c| c.attr("w:val"))
            .and_then(Rgb::from_hex);

        Some(Run::styled(
            text,
            RunStyle {
                bold: is_on(rpr.child("w:b")),
                italic: is_on(rpr.child("w:i")),
                underline,
                strike: is_on(rpr.child("w:strike")) || is_on(rpr.child("w:dstrike")),
                code: false,
                vertical,
                color,
            },
        ))
    }

    fn is_code_run(&self, rpr: Option<&XmlNode>) -> bool {
        let Some(rpr) = rpr else {
            return false;
        };

        if let Some(style) = rpr.child("w:rStyle").and_then(|s| s.attr("w:val")) {
            let name = self.styles.name(style);
            if CODE_STYLE_HINTS.iter().any(|hint| name.contains(hint)) {
                return true;
            }
        }

        rpr.child("w:rFonts")
            .map(|fonts| {
                ["w:ascii", "w:hAnsi", "w:cs", "w:eastAsia"]
                    .iter()
                    .filter_map(|attr| fonts.attr(attr))
                    .any(|font| {
                        let font = font.to_lowercase();
                        CODE_FONT_HINTS.iter().any(|hint| font.contains(hint))
                    })
            })
            .unwrap_or(false)
    }

    fn image(&mut self, drawing: &XmlNode) -> Option<ImageData> {
        let id = drawing
            .find("a:blip")
            .and_then(|b| b.attr("r:embed"))
            .or_else(|| drawing.find("v:imagedata").and_then(|i| i.attr("r:id")))?;
        let target = self.rels.target(id)?.to_string();

        match self.package.part(&target) {
            Ok(Some(bytes)) => Some(ImageData {
                name: target,
                bytes,
            }),
            Ok(None) => {
                tracing::debug!("Image part {} missing from package", target);
                None
            }
            Err(e) => {
                tracing::debug!("Error extracting image: {:#}", e);
                None
            }
        }
    }
}

/// `Heading 1` -> 1, `Heading 2` -> 2, any other `Heading*` -> 3
fn heading_level(style_name: &str) -> Option<u8> {
    // style ids ("heading1") stand in for names when styles.xml is absent
    let compact: String = style_name.split_whitespace().collect();
    if compact.starts_with("heading1") {
        Some(1)
    } else if compact.starts_with("heading2") {
        Some(2)
    } else if compact.starts_with("heading") {
        Some(3)
    } else {
        None
    }
}

/// (ordered, level) for list paragraphs
fn list_info(style_name: &str, ppr: Option<&XmlNode>) -> Option<(bool, u8)> {
    let ordered = if style_name.contains("list number") {
        true
    } else if style_name.contains("list bullet") || style_name.contains("list") {
        false
    } else if ppr.and_then(|p| p.child("w:numPr")).is_some() {
        false
    } else {
        return None;
    };

    let nested = if style_name.contains('2') || style_name.contains('3') {
        true
    } else {
        ppr.and_then(|p| p.child("w:ind"))
            .and_then(|ind| ind.attr("w:left").or_else(|| ind.attr("w:start")))
            .and_then(|v| v.parse::<i64>().ok())
            .map(|left| left > NESTED_INDENT_TWIPS)
            .unwrap_or(false)
    };

    Some((ordered, u8::from(nested)))
}

/// Visible text of one run
fn run_text(run: &XmlNode) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child.name.as_str() {
            "w:t" => text.push_str(&child.text),
            "w:tab" | "w:ptab" => text.push('\t'),
            "w:br" | "w:cr" => text.push('\n'),
            "w:noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

/// Text of a paragraph's runs, ignoring drawings and deleted text
fn paragraph_text(paragraph: &XmlNode) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        match child.name.as_str() {
            "w:r" => text.push_str(&run_text(child)),
            "w:hyperlink" | "w:ins" | "w:smartTag" | "w:fldSimple" | "w:customXml" => {
                text.push_str(&paragraph_text(child))
            }
            _ => {}
        }
    }
    text
}

fn table(element: &XmlNode) -> Option<Table> {
    let rows: Vec<Vec<String>> = element
        .children_named("w:tr")
        .map(|row| {
            row.children
                .iter()
                .filter(|c| c.is("w:tc") || c.is("w:sdt"))
                .flat_map(|c| {
                    if c.is("w:tc") {
                        vec![c]
                    } else {
                        c.descendants("w:tc")
                    }
                })
                .map(cell_text)
                .collect()
        })
        .filter(|row: &Vec<String>| !row.is_empty())
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(Table { rows })
    }
}

/// Cell paragraphs joined with newlines
fn cell_text(cell: &XmlNode) -> String {
    cell.descendants("w:p")
        .into_iter()
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a DOCX package around the given body XML
    pub(crate) fn build_docx(body: &str, styles: Option<&str>, media: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#).unwrap();

        zip.start_file("word/document.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
        .unwrap();

        if let Some(styles) = styles {
            zip.start_file("word/styles.xml", options).unwrap();
            write!(
                zip,
                r#"<?xml version="1.0" encoding="UTF-8"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{}</w:styles>"#,
                styles
            )
            .unwrap();
        }

        if !media.is_empty() {
            let mut rels = String::from(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            );
            for (i, (name, bytes)) in media.iter().enumerate() {
                rels.push_str(&format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
                    i + 1,
                    name
                ));
                zip.start_file(format!("word/media/{}", name), options).unwrap();
                zip.write_all(bytes).unwrap();
            }
            rels.push_str("</Relationships>");
            zip.start_file("word/_rels/document.xml.rels", options).unwrap();
            zip.write_all(rels.as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    const STYLES: &str = r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/></w:style><w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/></w:style><w:style w:type="paragraph" w:styleId="ListBullet2"><w:name w:val="List Bullet 2"/></w:style><w:style w:type="character" w:styleId="CodeChar"><w:name w:val="Code Char"/></w:style>"#;

    fn paragraph(style: &str, runs: &str) -> String {
        format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr>{}</w:p>"#,
            style, runs
        )
    }

    #[test]
    fn test_headings_and_lists() {
        let body = [
            paragraph("Heading1", "<w:r><w:t>Title</w:t></w:r>"),
            paragraph("Heading2", "<w:r><w:t>Section</w:t></w:r>"),
            paragraph("ListNumber", "<w:r><w:t>first</w:t></w:r>"),
            paragraph("ListBullet2", "<w:r><w:t>nested</w:t></w:r>"),
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/></w:numPr><w:ind w:left="1440"/></w:pPr><w:r><w:t>deep</w:t></w:r></w:p>"#.to_string(),
        ]
        .concat();
        let bytes = build_docx(&body, Some(STYLES), &[]);
        let doc = DocxConverter.parse(&bytes).unwrap();

        let kinds: Vec<ParagraphKind> = doc
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ParagraphKind::Heading(1),
                ParagraphKind::Heading(2),
                ParagraphKind::ListItem { ordered: true, level: 0 },
                ParagraphKind::ListItem { ordered: false, level: 1 },
                ParagraphKind::ListItem { ordered: false, level: 1 },
            ]
        );
    }

    #[test]
    fn test_run_formatting() {
        let body = r#"<w:p>
<w:r><w:rPr><w:b/><w:i w:val="0"/></w:rPr><w:t>bold</w:t></w:r>
<w:r><w:rPr><w:u w:val="single"/><w:color w:val="FF0000"/><w:vertAlign w:val="superscript"/></w:rPr><w:t xml:space="preserve"> red</w:t></w:r>
<w:r><w:rPr><w:rStyle w:val="CodeChar"/><w:b/></w:rPr><w:t xml:space="preserve"> x = 1</w:t></w:r>
<w:r><w:rPr><w:rFonts w:ascii="Consolas"/></w:rPr><w:t>y</w:t><w:br/><w:t>z</w:t></w:r>
</w:p>"#;
        let bytes = build_docx(body, Some(STYLES), &[]);
        let doc = DocxConverter.parse(&bytes).unwrap();

        let Block::Paragraph(p) = &doc.blocks[0] else {
            panic!("expected paragraph, got {:?}", doc.blocks[0]);
        };
        assert_eq!(p.runs.len(), 4);
        assert!(p.runs[0].style.bold);
        assert!(!p.runs[0].style.italic);
        assert!(p.runs[1].style.underline);
        assert_eq!(p.runs[1].style.color, Some(Rgb(255, 0, 0)));
        assert_eq!(p.runs[1].style.vertical, VerticalAlign::Superscript);
        // code takes precedence over other formatting
        assert!(p.runs[2].style.code);
        assert!(!p.runs[2].style.bold);
        assert!(p.runs[3].style.code);
        assert_eq!(p.runs[3].text, "y\nz");
    }

    #[test]
    fn test_rules_spacers_and_tables() {
        let body = r#"<w:p><w:pPr><w:pBdr><w:bottom w:val="single"/></w:pBdr></w:pPr></w:p>
<w:p/>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Qty</w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p><w:r><w:t>Apples</w:t></w:r></w:p><w:p><w:r><w:t>red</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>3</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;
        let bytes = build_docx(body, None, &[]);
        let doc = DocxConverter.parse(&bytes).unwrap();

        assert_eq!(doc.blocks[0], Block::Rule);
        assert_eq!(doc.blocks[1], Block::Spacer);
        let Block::Table(table) = &doc.blocks[2] else {
            panic!("expected table");
        };
        assert_eq!(table.rows[0], vec!["Name", "Qty"]);
        assert_eq!(table.rows[1], vec!["Apples\nred", "3"]);
    }

    #[test]
    fn test_inline_image() {
        let png: &[u8] = &[0x89, b'P', b'N', b'G'];
        let body = r#"<w:p><w:r><w:t>Figure</w:t></w:r><w:r><w:drawing><a:graphic><a:graphicData><a:blip r:embed="rId1"/></a:graphicData></a:graphic></w:drawing></w:r></w:p>"#;
        let bytes = build_docx(body, None, &[("image1.png", png)]);
        let doc = DocxConverter.parse(&bytes).unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert!(matches!(&doc.blocks[0], Block::Paragraph(p) if p.text() == "Figure"));
        let Block::Image(image) = &doc.blocks[1] else {
            panic!("expected image");
        };
        assert_eq!(image.name, "word/media/image1.png");
        assert_eq!(image.bytes, png);
    }

    #[test]
    fn test_not_a_zip() {
        let err = DocxConverter.parse(b"plain text").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("DOCX to PDF conversion error"));
        assert!(message.contains("not a valid DOCX"));
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("heading 1"), Some(1));
        assert_eq!(heading_level("heading2"), Some(2));
        assert_eq!(heading_level("heading 4"), Some(3));
        assert_eq!(heading_level("title"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("../media/a.png"), "media/a.png");
        assert_eq!(resolve_target("/word/media/b.png"), "word/media/b.png");
    }
}
