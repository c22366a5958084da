//! Engine configuration

use crate::GalleryError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub cache: CacheConfig,
    pub scan: ScanConfig,
}

/// Cache geometry
///
/// Fixed for the cache's lifetime; validated at engine construction, not at
/// deserialization, so a config file with bad geometry still loads and can
/// be reported properly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of decoded images resident at once
    pub capacity: usize,
    /// Window indices retained ahead of the current position
    pub preload_ahead: usize,
    /// Window indices retained behind the current position
    pub keep_behind: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            preload_ahead: 5,
            keep_behind: 3,
        }
    }
}

impl CacheConfig {
    /// Reject geometry the cache cannot operate with
    pub fn validate(&self) -> Result<(), GalleryError> {
        if self.capacity == 0 {
            return Err(GalleryError::Config(
                "cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Folder scanning options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Include hidden files in the catalog
    pub include_hidden: bool,
}

impl GalleryConfig {
    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "LightningGallery", "LightningGallery")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}
