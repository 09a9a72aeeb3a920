//! Configuration management for the DocReader server

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for the conversion endpoint, e.g. `/docreader`; empty for none
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    /// Documents are only served from below this directory
    pub root_dir: PathBuf,
    /// Seconds before a conversion is abandoned; 0 disables the limit
    pub timeout_secs: u64,
    /// Searched for fonts before the platform font directories
    pub font_dirs: Vec<PathBuf>,
}

impl ConversionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8765,
                base_url: String::new(),
            },
            conversion: ConversionConfig {
                root_dir: PathBuf::from("."),
                timeout_secs: 120,
                font_dirs: Vec::new(),
            },
        }
    }
}

/// Normalize a base URL to `/prefix` form (no trailing slash), or empty
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        let root_dir = match env::var("DOCREADER_ROOT_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => {
                let cwd = env::current_dir().unwrap_or_else(|_| defaults.conversion.root_dir.clone());
                tracing::warn!(
                    "DOCREADER_ROOT_DIR not set, serving documents from the working directory {}",
                    cwd.display()
                );
                cwd
            }
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("DOCREADER_HOST").unwrap_or(defaults.server.host),
                port: env::var("DOCREADER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
                base_url: normalize_base_url(&env::var("DOCREADER_BASE_URL").unwrap_or_default()),
            },
            conversion: ConversionConfig {
                root_dir,
                timeout_secs: env::var("DOCREADER_CONVERT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.trim().parse().ok())
                    .unwrap_or(defaults.conversion.timeout_secs),
                font_dirs: env::var_os("DOCREADER_FONT_DIRS")
                    .map(|dirs| env::split_paths(&dirs).filter(|p| !p.as_os_str().is_empty()).collect())
                    .unwrap_or_default(),
            },
        })
    }
}
