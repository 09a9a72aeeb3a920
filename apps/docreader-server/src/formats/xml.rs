//! Minimal element tree over quick-xml events
//!
//! WordprocessingML parts are small enough to hold in memory, and walking a
//! tree keeps the DOCX rules readable. Names keep their prefix (`w:p`,
//! `a:blip`) since DrawingML and WordprocessingML reuse local names.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Character data directly inside this element
    pub text: String,
}

impl XmlNode {
    pub fn parse(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlNode> = vec![XmlNode {
            name: "#document".to_string(),
            ..Default::default()
        }];

        loop {
            let event = reader
                .read_event()
                .with_context(|| format!("XML error at byte {}", reader.buffer_position()))?;
            match event {
                Event::Start(e) => stack.push(Self::from_start(&e)?),
                Event::Empty(e) => {
                    let node = Self::from_start(&e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        if let Some(node) = stack.pop() {
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(node);
                            }
                        }
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape().context("Invalid XML text")?;
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    let bytes = c.into_inner();
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(&bytes));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        // unclosed elements still belong to the tree
        while stack.len() > 1 {
            if let Some(node) = stack.pop() {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
        }

        let mut document = stack.pop().unwrap_or_default();
        match document.children.len() {
            0 => anyhow::bail!("XML document has no root element"),
            _ => Ok(document.children.remove(0)),
        }
    }

    fn from_start(e: &BytesStart<'_>) -> Result<XmlNode> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes().with_checks(false) {
            let attr = attr.with_context(|| format!("Invalid attribute on <{}>", name))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .with_context(|| format!("Invalid attribute value on <{}>", name))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(XmlNode {
            name,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with this name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.is(name))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// All descendants with this name, in document order
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        let mut out = Vec::new();
        self.collect_descendants(name, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.is(name) {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }

    /// First descendant with this name
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.is(name) {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="x"><w:body><w:p><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r><w:r><w:br/></w:r></w:p></w:body></w:document>"#;
        let root = XmlNode::parse(xml).unwrap();
        assert!(root.is("w:document"));
        let body = root.child("w:body").unwrap();
        let t = body.find("w:t").unwrap();
        assert_eq!(t.text, " a & b ");
        assert_eq!(t.attr("xml:space"), Some("preserve"));
        assert_eq!(body.descendants("w:r").len(), 2);
        assert!(body.find("w:br").is_some());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(XmlNode::parse("   ").is_err());
    }
}
