//! Font discovery
//!
//! Looks for a Unicode-capable TrueType family in the configured and
//! platform font directories. The result is computed once per process and
//! shared by every conversion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use walkdir::WalkDir;

use super::chain::{FontChain, FontDescriptor, FontWeight, LoadedFont, UnicodeFamily};

/// Directory depth searched below each font location
const MAX_SEARCH_DEPTH: usize = 4;

/// A family we know how to look for, with its file name per face
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontCandidate {
    pub family: String,
    pub regular: String,
    pub bold: String,
    pub italic: String,
    pub bold_italic: String,
}

impl FontCandidate {
    pub fn new(family: &str, regular: &str, bold: &str, italic: &str, bold_italic: &str) -> Self {
        Self {
            family: family.to_string(),
            regular: regular.to_string(),
            bold: bold.to_string(),
            italic: italic.to_string(),
            bold_italic: bold_italic.to_string(),
        }
    }
}

/// Families tried in order
pub fn default_candidates() -> Vec<FontCandidate> {
    vec![
        FontCandidate::new(
            "DejaVu Sans",
            "DejaVuSans.ttf",
            "DejaVuSans-Bold.ttf",
            "DejaVuSans-Oblique.ttf",
            "DejaVuSans-BoldOblique.ttf",
        ),
        FontCandidate::new(
            "Liberation Sans",
            "LiberationSans-Regular.ttf",
            "LiberationSans-Bold.ttf",
            "LiberationSans-Italic.ttf",
            "LiberationSans-BoldItalic.ttf",
        ),
        FontCandidate::new(
            "FreeSans",
            "FreeSans.ttf",
            "FreeSansBold.ttf",
            "FreeSansOblique.ttf",
            "FreeSansBoldOblique.ttf",
        ),
        FontCandidate::new(
            "Noto Sans",
            "NotoSans-Regular.ttf",
            "NotoSans-Bold.ttf",
            "NotoSans-Italic.ttf",
            "NotoSans-BoldItalic.ttf",
        ),
        FontCandidate::new("Arial", "arial.ttf", "arialbd.ttf", "ariali.ttf", "arialbi.ttf"),
    ]
}

/// Platform font locations, most specific first
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs_out = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
    ];
    if let Some(user) = dirs::font_dir() {
        dirs_out.push(user);
    }
    if let Some(home) = dirs::home_dir() {
        dirs_out.push(home.join(".fonts"));
    }
    dirs_out.push(PathBuf::from("/Library/Fonts"));
    dirs_out.push(PathBuf::from("/System/Library/Fonts"));
    if let Some(windir) = std::env::var_os("WINDIR") {
        dirs_out.push(PathBuf::from(windir).join("Fonts"));
    }

    let mut seen = Vec::new();
    dirs_out.retain(|d| {
        if seen.contains(d) {
            false
        } else {
            seen.push(d.clone());
            true
        }
    });
    dirs_out
}

/// Font files below one search location, keyed by lowercase file name
struct FontIndex {
    files: HashMap<String, PathBuf>,
}

impl FontIndex {
    fn build(root: &Path) -> Self {
        let mut files = HashMap::new();
        let walker = WalkDir::new(root)
            .max_depth(MAX_SEARCH_DEPTH)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file());

        for entry in walker {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.ends_with(".ttf") {
                files.entry(name).or_insert_with(|| entry.into_path());
            }
        }
        Self { files }
    }

    fn find(&self, file_name: &str) -> Option<&PathBuf> {
        self.files.get(&file_name.to_lowercase())
    }
}

/// Finds and caches the process-wide [`FontChain`]
pub struct FontResolver {
    candidates: Vec<FontCandidate>,
    search_paths: Vec<PathBuf>,
    chain: OnceLock<Arc<FontChain>>,
}

impl FontResolver {
    /// Resolver over the extra directories followed by the platform locations
    pub fn new(extra_dirs: Vec<PathBuf>) -> Self {
        let mut search_paths = extra_dirs;
        search_paths.extend(system_font_dirs());
        Self::with_search_paths(search_paths)
    }

    /// Resolver over exactly these locations
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            candidates: default_candidates(),
            search_paths,
            chain: OnceLock::new(),
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// The chain, discovered on first use
    pub fn resolve(&self) -> Arc<FontChain> {
        self.chain
            .get_or_init(|| {
                let chain = Arc::new(self.discover());
                match chain.unicode() {
                    Some(family) => tracing::info!(
                        "Unicode font family resolved: {} ({})",
                        family.family,
                        family.regular.descriptor.source_path.display()
                    ),
                    None => tracing::warn!(
                        "FontResolutionDegraded: no Unicode font found in {} location(s); \
                         using built-in Helvetica, characters outside Windows-1252 render as '?'",
                        self.search_paths.len()
                    ),
                }
                chain
            })
            .clone()
    }

    /// Whether discovery already ran
    pub fn is_resolved(&self) -> bool {
        self.chain.get().is_some()
    }

    fn discover(&self) -> FontChain {
        let indexes: Vec<FontIndex> = self
            .search_paths
            .iter()
            .filter(|p| p.is_dir())
            .map(|p| {
                tracing::debug!("Indexing fonts in {}", p.display());
                FontIndex::build(p)
            })
            .collect();

        for candidate in &self.candidates {
            for index in &indexes {
                if let Some(family) = Self::load_family(candidate, index) {
                    return FontChain::with_unicode(family);
                }
            }
        }

        FontChain::builtin_only()
    }

    /// Regular and bold must come from the same location and both parse
    fn load_family(candidate: &FontCandidate, index: &FontIndex) -> Option<UnicodeFamily> {
        let regular_path = index.find(&candidate.regular)?;
        let bold_path = index.find(&candidate.bold)?;

        let load = |path: &PathBuf, weight: FontWeight, italic: bool| {
            LoadedFont::load(FontDescriptor {
                family: candidate.family.clone(),
                weight,
                italic,
                source_path: path.clone(),
            })
        };

        let regular = match load(regular_path, FontWeight::Regular, false) {
            Ok(font) => font,
            Err(e) => {
                tracing::debug!("Skipping {}: {:#}", candidate.family, e);
                return None;
            }
        };
        let bold = match load(bold_path, FontWeight::Bold, false) {
            Ok(font) => font,
            Err(e) => {
                tracing::debug!("Skipping {}: {:#}", candidate.family, e);
                return None;
            }
        };

        let optional = |file_name: &str, weight: FontWeight| {
            let path = index.find(file_name)?;
            load(path, weight, true)
                .map_err(|e| tracing::debug!("Ignoring italic face: {:#}", e))
                .ok()
        };

        Some(UnicodeFamily {
            family: candidate.family.clone(),
            italic: optional(&candidate.italic, FontWeight::Regular),
            bold_italic: optional(&candidate.bold_italic, FontWeight::Bold),
            regular,
            bold,
        })
    }
}
