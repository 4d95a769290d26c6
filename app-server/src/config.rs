//! Server configuration loaded from TOML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use snapchef_semantic_cache::CacheConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SNAPCHEF_CONFIG";

/// Environment variable overriding the cache directory.
pub const STORE_DIR_ENV: &str = "SNAPCHEF_STORE_DIR";

/// Top-level configuration file.
///
/// ```toml
/// [cache]
/// store_dir = "/var/lib/snapchef/cache"
/// recipe_threshold = 0.6
///
/// [cache.embedding]
/// provider = "http"
/// base_url = "http://127.0.0.1:8080/v1"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Semantic cache settings.
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load from the environment: `$SNAPCHEF_CONFIG`, else the default path.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(Self::default_path);
        let store_dir = std::env::var_os(STORE_DIR_ENV).map(PathBuf::from);
        Self::load_from(path.as_deref(), store_dir)
    }

    /// `<data dir>/snapchef/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("snapchef").join("config.toml"))
    }

    /// Load from `path`, using defaults when it does not exist, then apply
    /// a store directory override.
    pub fn load_from(path: Option<&Path>, store_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))?
            }
            _ => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        if let Some(dir) = store_dir {
            config.cache.store_dir = dir;
        }
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }
}
