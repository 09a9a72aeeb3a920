//! Application state management

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::fonts::FontResolver;
use crate::resolver::PathResolver;
use crate::service::ConversionService;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Content root {path} is not a readable directory: {source}")]
    ContentRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    service: ConversionService,
}

impl AppState {
    /// Create the state for a configuration
    ///
    /// Font discovery is deferred until [`FontResolver::resolve`] is first
    /// called; `main` triggers it eagerly before serving.
    pub fn new(config: Config) -> Result<Self, StateError> {
        let fonts = Arc::new(FontResolver::new(config.conversion.font_dirs.clone()));
        Self::with_fonts(config, fonts)
    }

    /// Create the state with a specific font resolver
    pub fn with_fonts(config: Config, fonts: Arc<FontResolver>) -> Result<Self, StateError> {
        let root = &config.conversion.root_dir;
        let resolver = PathResolver::new(root).map_err(|source| StateError::ContentRoot {
            path: root.clone(),
            source,
        })?;
        let service = ConversionService::new(resolver, fonts, config.conversion.timeout());

        Ok(Self {
            inner: Arc::new(AppStateInner { config, service }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the conversion service
    pub fn service(&self) -> &ConversionService {
        &self.inner.service
    }

    /// Get the font resolver
    pub fn fonts(&self) -> &Arc<FontResolver> {
        self.inner.service.fonts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_requires_directory_root() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.conversion.root_dir = dir.path().join("nope");
        let err = AppState::new(config).err().unwrap();
        assert!(matches!(err, StateError::ContentRoot { .. }));

        let mut config = Config::default();
        config.conversion.root_dir = dir.path().to_path_buf();
        let state = AppState::new(config).unwrap();
        assert!(!state.fonts().is_resolved());
    }
}
