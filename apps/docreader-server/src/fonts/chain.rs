//! Resolved font chain

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Regular => write!(f, "regular"),
            FontWeight::Bold => write!(f, "bold"),
        }
    }
}

/// One face of a font family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDescriptor {
    pub family: String,
    pub weight: FontWeight,
    pub italic: bool,
    pub source_path: PathBuf,
}

/// A font file read into memory and checked to parse
#[derive(Clone)]
pub struct LoadedFont {
    pub descriptor: FontDescriptor,
    pub data: Arc<Vec<u8>>,
}

impl LoadedFont {
    pub fn load(descriptor: FontDescriptor) -> Result<Self> {
        let path = &descriptor.source_path;
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        ttf_parser::Face::parse(&data, 0)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to parse font file {}", path.display()))?;

        Ok(Self {
            descriptor,
            data: Arc::new(data),
        })
    }

    /// Parsed view of the font; the bytes were validated at load time
    pub fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).ok()
    }
}

impl fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFont")
            .field("descriptor", &self.descriptor)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A Unicode-capable family; regular and bold are always present
#[derive(Debug, Clone)]
pub struct UnicodeFamily {
    pub family: String,
    pub regular: LoadedFont,
    pub bold: LoadedFont,
    pub italic: Option<LoadedFont>,
    pub bold_italic: Option<LoadedFont>,
}

impl UnicodeFamily {
    pub fn faces(&self) -> impl Iterator<Item = &LoadedFont> {
        [Some(&self.regular), Some(&self.bold)]
            .into_iter()
            .chain([self.italic.as_ref(), self.bold_italic.as_ref()])
            .flatten()
    }
}

/// Ordered fonts for rendering: the Unicode family (if any) then the
/// built-in Helvetica/Courier family
#[derive(Debug, Clone, Default)]
pub struct FontChain {
    unicode: Option<UnicodeFamily>,
}

pub const BUILTIN_FAMILY: &str = "Helvetica";

impl FontChain {
    pub fn builtin_only() -> Self {
        Self { unicode: None }
    }

    pub fn with_unicode(family: UnicodeFamily) -> Self {
        Self {
            unicode: Some(family),
        }
    }

    pub fn unicode(&self) -> Option<&UnicodeFamily> {
        self.unicode.as_ref()
    }

    /// No Unicode family was found; non-WinAnsi text renders as `?`
    pub fn is_degraded(&self) -> bool {
        self.unicode.is_none()
    }

    /// Name of the primary family
    pub fn family_name(&self) -> &str {
        self.unicode
            .as_ref()
            .map(|u| u.family.as_str())
            .unwrap_or(BUILTIN_FAMILY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_chain() {
        let chain = FontChain::builtin_only();
        assert!(chain.is_degraded());
        assert_eq!(chain.family_name(), "Helvetica");
        assert!(chain.unicode().is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("DejaVuSans.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let result = LoadedFont::load(FontDescriptor {
            family: "DejaVu Sans".into(),
            weight: FontWeight::Regular,
            italic: false,
            source_path: path,
        });
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse font file"));
    }
}
