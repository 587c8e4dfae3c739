//! User settings
//!
//! Reads `config.toml` from the config directory. Settings provide fleet-wide
//! provisioning defaults and tune how devices are imaged and mounted. Every
//! value can be overridden on the command line.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::config::defaults;
use crate::infra::dirs::SdflashDirs;

/// Settings error types
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: String, error: String },
}

/// Settings loaded from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Default field values applied to every provisioned device
    #[serde(default)]
    pub provision: ProvisionDefaults,

    /// Imaging and mount options
    #[serde(default)]
    pub flash: FlashSettings,

    /// Image download options
    #[serde(default)]
    pub download: DownloadSettings,
}

/// Default provisioning values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionDefaults {
    /// Hostname
    pub hostname: Option<String>,

    /// WiFi SSID
    pub wifi_ssid: Option<String>,

    /// WiFi password
    pub wifi_password: Option<String>,

    /// Cluster-lab run-on-boot flag
    pub cluster_lab: Option<bool>,
}

/// Imaging and mount options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashSettings {
    /// `dd` block size
    pub block_size: Option<String>,

    /// Boot partition filesystem type, skips probing when set
    pub boot_fs_type: Option<String>,

    /// Seconds to wait after imaging before mounting
    pub settle_secs: Option<u64>,
}

/// Download options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Maximum download attempts
    pub max_retries: Option<u32>,

    /// Keep downloaded images in the cache directory
    pub keep: Option<bool>,
}

impl Settings {
    /// Load settings from the config directory
    pub fn load(dirs: &SdflashDirs) -> Result<Self, SettingsError> {
        Self::load_from_path(&dirs.settings_path())
    }

    /// Load settings from a specific path
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Effective `dd` block size
    #[must_use]
    pub fn block_size(&self) -> &str {
        self.flash
            .block_size
            .as_deref()
            .unwrap_or(defaults::DEFAULT_BLOCK_SIZE)
    }

    /// Effective settle delay
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(
            self.flash
                .settle_secs
                .unwrap_or(defaults::DEFAULT_SETTLE_SECS),
        )
    }

    /// Effective number of download attempts
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.download
            .max_retries
            .unwrap_or(defaults::MAX_DOWNLOAD_RETRIES)
    }

    /// Whether downloaded images stay in the cache
    #[must_use]
    pub fn keep_downloads(&self) -> bool {
        self.download.keep.unwrap_or(true)
    }
}
