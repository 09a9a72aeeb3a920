//! Request path resolution
//!
//! Requested paths are always relative to the content root. Anything that
//! could reach outside it is reported as not found.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{ConversionError, Result};

/// A request path that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path as sent by the client
    pub requested: String,
    /// Canonical location on disk
    pub full_path: PathBuf,
}

impl ResolvedPath {
    /// Lowercase extension, empty when there is none
    pub fn extension(&self) -> String {
        self.full_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given content root (must exist)
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("content root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath> {
        let trimmed = requested.trim();
        if trimmed.is_empty() {
            return Err(ConversionError::InvalidRequest(
                "No file path provided".to_string(),
            ));
        }

        let relative = trimmed.trim_start_matches(['/', '\\']);
        let mut candidate = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => candidate.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(self.not_found(
                        trimmed,
                        self.root.join(relative),
                        "path escapes the content root",
                    ));
                }
            }
        }

        let full_path = match candidate.canonicalize() {
            Ok(path) => path,
            Err(e) => return Err(self.not_found(trimmed, candidate, &e.to_string())),
        };

        if !full_path.starts_with(&self.root) {
            return Err(self.not_found(trimmed, full_path, "path escapes the content root"));
        }
        if !full_path.is_file() {
            return Err(self.not_found(trimmed, full_path, "not a regular file"));
        }
        if let Err(e) = File::open(&full_path) {
            return Err(self.not_found(trimmed, full_path, &e.to_string()));
        }

        tracing::debug!("Resolved {} -> {}", trimmed, full_path.display());

        Ok(ResolvedPath {
            requested: trimmed.to_string(),
            full_path,
        })
    }

    fn not_found(&self, requested: &str, full_path: PathBuf, reason: &str) -> ConversionError {
        ConversionError::PathNotFound {
            requested: requested.to_string(),
            full_path,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathResolver) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("reports")).unwrap();
        fs::write(dir.path().join("notes.docx"), b"PK").unwrap();
        fs::write(dir.path().join("reports/q3.rtf"), b"{\\rtf1 }").unwrap();
        let resolver = PathResolver::new(dir.path()).unwrap();
        (dir, resolver)
    }

    #[test]
    fn test_resolves_inside_root() {
        let (_dir, resolver) = setup();
        let resolved = resolver.resolve("notes.docx").unwrap();
        assert_eq!(resolved.requested, "notes.docx");
        assert!(resolved.full_path.starts_with(resolver.root()));
        assert_eq!(resolved.extension(), "docx");

        let nested = resolver.resolve("./reports/q3.rtf").unwrap();
        assert!(nested.full_path.ends_with("reports/q3.rtf"));
    }

    #[test]
    fn test_leading_slash_is_relative_to_root() {
        let (_dir, resolver) = setup();
        let resolved = resolver.resolve("/notes.docx").unwrap();
        assert_eq!(resolved.full_path, resolver.root().join("notes.docx"));
    }

    #[test]
    fn test_empty_path_is_invalid_request() {
        let (_dir, resolver) = setup();
        let err = resolver.resolve("   ").unwrap_err();
        assert_eq!(err.error_type(), "InvalidRequest");
        assert_eq!(err.to_string(), "No file path provided");
    }

    #[test]
    fn test_traversal_is_rejected() {
        let (_dir, resolver) = setup();
        for path in ["../etc/passwd", "reports/../../secret.docx", "reports/../notes.docx"] {
            let err = resolver.resolve(path).unwrap_err();
            assert_eq!(err.error_type(), "PathNotFound", "{}", path);
        }
    }

    #[test]
    fn test_missing_file_echoes_paths() {
        let (_dir, resolver) = setup();
        let err = resolver.resolve("missing.docx").unwrap_err();
        assert_eq!(err.requested_path(), Some("missing.docx"));
        assert_eq!(
            err.full_path(),
            Some(resolver.root().join("missing.docx").as_path())
        );
    }

    #[test]
    fn test_directory_is_not_a_document() {
        let (_dir, resolver) = setup();
        let err = resolver.resolve("reports").unwrap_err();
        assert_eq!(err.error_type(), "PathNotFound");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root_is_rejected() {
        let (dir, resolver) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.docx"), b"PK").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.docx"),
            dir.path().join("link.docx"),
        )
        .unwrap();

        let err = resolver.resolve("link.docx").unwrap_err();
        assert_eq!(err.error_type(), "PathNotFound");
    }
}
