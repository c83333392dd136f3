//! Catalog configuration, persisted as TOML, and XDG path resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

const APP_DIR: &str = "book-catalog";

/// XDG-compliant directories for the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPaths {
    /// `$XDG_CONFIG_HOME/book-catalog/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/book-catalog/`
    pub data_dir: PathBuf,
}

impl CatalogPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let home = lookup("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::NoHome)?;

        let config_dir = lookup("XDG_CONFIG_HOME")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".config"))
            .join(APP_DIR);

        let data_dir = lookup("XDG_DATA_HOME")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".local/share"))
            .join(APP_DIR);

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default database location.
    pub fn default_database(&self) -> PathBuf {
        self.data_dir.join("catalog.db")
    }
}

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database file. Defaults to `catalog.db` under the data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Cover lookup endpoint.
    #[serde(default = "default_cover_api_url")]
    pub cover_api_url: String,
    /// Per-request HTTP timeout for cover lookups.
    #[serde(default = "default_cover_timeout_secs")]
    pub cover_timeout_secs: u64,
    /// Largest accepted cover payload in bytes.
    #[serde(default = "default_cover_max_bytes")]
    pub cover_max_bytes: u64,
    /// Cap on cover fetches queued or running at once.
    #[serde(default = "default_cover_max_in_flight")]
    pub cover_max_in_flight: usize,
    /// Listen address of the REST server.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_cover_api_url() -> String {
    "http://localhost:8000/bookcover".into()
}
fn default_cover_timeout_secs() -> u64 {
    10
}
fn default_cover_max_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_cover_max_in_flight() -> usize {
    8
}
fn default_bind_address() -> String {
    "127.0.0.1:8080".into()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            cover_api_url: default_cover_api_url(),
            cover_timeout_secs: default_cover_timeout_secs(),
            cover_max_bytes: default_cover_max_bytes(),
            cover_max_in_flight: default_cover_max_in_flight(),
            bind_address: default_bind_address(),
        }
    }
}

impl CatalogConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path`, or fall back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Effective database path.
    pub fn database_path(&self, paths: &CatalogPaths) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| paths.default_database())
    }
}
