//! Platform-specific directory management
//!
//! Provides the config directory (for `config.toml`) and the cache directory
//! (for downloaded and decompressed images). Follows the XDG Base Directory
//! Specification on Linux and standard locations on macOS.
//!
//! Environment variables can override default directories:
//! - `SDFLASH_CACHE_DIR` - Override cache directory
//! - `SDFLASH_CONFIG_DIR` - Override config directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "SDFLASH_CACHE_DIR";
pub const ENV_CONFIG_DIR: &str = "SDFLASH_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "sdflash";

/// Subdirectory for image files
const IMAGES_SUBDIR: &str = "images";

/// Platform-specific directory provider for sdflash
#[derive(Debug, Clone)]
pub struct SdflashDirs {
    cache_dir: PathBuf,
    config_dir: PathBuf,
}

impl SdflashDirs {
    /// Create a new `SdflashDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: resolve(ENV_CACHE_DIR, dirs::cache_dir, ".cache"),
            config_dir: resolve(ENV_CONFIG_DIR, dirs::config_dir, ".config"),
        }
    }

    /// Get the cache directory path
    ///
    /// - Linux: `$XDG_CACHE_HOME/sdflash` or `~/.cache/sdflash`
    /// - macOS: `~/Library/Caches/sdflash`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/sdflash` or `~/.config/sdflash`
    /// - macOS: `~/Library/Application Support/sdflash`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Directory holding downloaded and decompressed images
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.cache_dir.join(IMAGES_SUBDIR)
    }

    /// Path to `config.toml` in the config directory
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

impl Default for SdflashDirs {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a directory from an environment override or the platform default
fn resolve(env_var: &str, platform: fn() -> Option<PathBuf>, home_fallback: &str) -> PathBuf {
    if let Ok(path) = env::var(env_var) {
        return PathBuf::from(path);
    }

    platform().map(|p| p.join(APP_NAME)).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_fallback)
            .join(APP_NAME)
    })
}
