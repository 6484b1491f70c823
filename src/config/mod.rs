//! Configuration module for mikr-rs
//!
//! Settings are stored as TOML. Every field has a default, so a partial (or
//! missing) file yields a usable configuration.
//!
//! # Config Location
//!
//! The default file lives in the platform-appropriate config directory under
//! `dev.mikr.mikr-rs`:
//!
//! - **Linux**: `~/.config/dev.mikr.mikr-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.mikr.mikr-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.mikr.mikr-rs\config.toml`
//!
//! # Example
//!
//! ```ignore
//! use mikr_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default(AppConfig::default_path().unwrap());
//! config.producer.data_file = Some("bridge_15mm.zip".into());
//! config.save("mikr.toml")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{MikrError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "dev.mikr.mikr-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub producer: ProducerConfig,
    pub playback: PlaybackConfig,
    pub handoff: HandoffConfig,
    pub logging: LoggingConfig,
}

/// Get the application config directory path
pub fn app_config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

impl AppConfig {
    /// Path of the default config file
    pub fn default_path() -> Option<PathBuf> {
        app_config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MikrError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            MikrError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration, returning defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MikrError::Config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MikrError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            MikrError::Config(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}
