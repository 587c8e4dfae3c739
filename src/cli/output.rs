//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! colored output, and formatted messages to the user.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::IsTerminal;
use std::sync::OnceLock;

use crate::core::flash::FlashResult;

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    if is_quiet() || is_json() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Create a progress bar for downloads
pub fn create_download_bar(total: u64) -> ProgressBar {
    if is_quiet() || is_json() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// Format a byte count for humans
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

/// Global output settings
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// Verbosity level from `-v` flags
    pub verbose: u8,
}

static OUTPUT_CONFIG: OnceLock<OutputConfig> = OnceLock::new();

impl OutputConfig {
    /// Create output settings from the global flags
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make these settings visible to every command
    ///
    /// Only the first call has an effect.
    pub fn apply_global(self) {
        let _ = OUTPUT_CONFIG.set(self);
    }

    /// Settings in effect
    pub fn current() -> Self {
        OUTPUT_CONFIG.get().copied().unwrap_or_default()
    }
}

/// Whether `--quiet` is in effect
pub fn is_quiet() -> bool {
    OutputConfig::current().quiet
}

/// Whether `--json` is in effect
pub fn is_json() -> bool {
    OutputConfig::current().json
}

fn paint(code: &str, text: &str, terminal: bool) -> String {
    if terminal {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn print_status(code: &str, symbol: &str, message: &str) {
    if is_quiet() || is_json() {
        return;
    }
    let symbol = paint(code, symbol, std::io::stdout().is_terminal());
    println!("{symbol} {message}");
}

/// Print a success message
pub fn print_success(message: &str) {
    print_status("32", status::SUCCESS, message);
}

/// Print an informational message
pub fn print_info(message: &str) {
    print_status("34", status::INFO, message);
}

/// Print a warning
pub fn print_warning(message: &str) {
    print_status("33", status::WARNING, message);
}

/// Print an indented detail line
pub fn print_detail(message: &str) {
    if is_quiet() || is_json() {
        return;
    }
    println!("  {message}");
}

/// Print a fatal error with its cause chain and a suggestion
pub fn display_error(error: &anyhow::Error) {
    let terminal = std::io::stderr().is_terminal();

    if is_json() {
        let json = serde_json::json!({
            "status": "error",
            "error": error.to_string(),
            "causes": error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
            "suggestion": suggestions::get_suggestion(error),
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return;
    }

    eprintln!("{} {error}", paint("31", status::ERROR, terminal));
    for cause in error.chain().skip(1) {
        eprintln!("  Caused by: {cause}");
    }
    if let Some(suggestion) = suggestions::get_suggestion(error) {
        eprintln!("  {} {suggestion}", paint("34", status::INFO, terminal));
    }
}

/// Summary banner shown after a successful flash
#[derive(Debug, Serialize)]
pub struct FlashSummary {
    /// Device written to
    pub device: String,
    /// Image written
    pub image: String,
    /// Image size in bytes
    pub image_size: u64,
    /// Boot partition provisioned
    pub boot_partition: String,
    /// Filesystem the boot partition was mounted with
    pub fs_type: String,
    /// Files copied onto the boot partition
    pub copied: Vec<String>,
    /// Fields written, as `field -> file`
    pub fields: Vec<String>,
    /// Fields that had no line to rewrite
    pub unmatched: Vec<String>,
}

impl FlashSummary {
    /// Build the summary for a finished flash
    pub fn from_result(result: &FlashResult) -> Self {
        let patch = &result.patch;
        Self {
            device: result.device.path.display().to_string(),
            image: result.image.display().to_string(),
            image_size: std::fs::metadata(&result.image).map_or(0, |m| m.len()),
            boot_partition: result.boot_partition.display().to_string(),
            fs_type: result.fs_type.clone(),
            copied: patch
                .copied
                .iter()
                .map(|c| c.dest.display().to_string())
                .collect(),
            fields: patch
                .substitutions
                .iter()
                .map(|s| format!("{} -> {}", s.field, s.file))
                .collect(),
            unmatched: patch.unmatched.iter().map(ToString::to_string).collect(),
        }
    }

    /// Print the banner
    pub fn print(&self) {
        if is_json() {
            let json = serde_json::json!({ "status": "success", "flash": self });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            return;
        }
        if is_quiet() {
            return;
        }

        println!();
        println!("  Image:          {} ({})", self.image, format_size(self.image_size));
        println!("  Device:         {}", self.device);
        println!("  Boot partition: {} ({})", self.boot_partition, self.fs_type);
        for file in &self.copied {
            println!("  Copied:         {file}");
        }
        for field in &self.fields {
            println!("  Set:            {field}");
        }
        for unmatched in &self.unmatched {
            print_warning(unmatched);
        }
        println!();
    }
}

/// Hints for common failures
pub mod suggestions {
    use crate::core::settings::SettingsError;
    use crate::error::{DeviceError, DownloadError, ImageError, PatchError, ResolveError};

    /// Find a suggestion for the first domain error in the chain
    pub fn get_suggestion(error: &anyhow::Error) -> Option<String> {
        error.chain().find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<ResolveError>() {
                return Some(resolve_suggestion(e));
            }
            if let Some(e) = cause.downcast_ref::<DeviceError>() {
                return device_suggestion(e);
            }
            if let Some(e) = cause.downcast_ref::<DownloadError>() {
                return Some(download_suggestion(e));
            }
            if let Some(e) = cause.downcast_ref::<ImageError>() {
                return Some(image_suggestion(e));
            }
            if let Some(e) = cause.downcast_ref::<PatchError>() {
                return patch_suggestion(e);
            }
            if let Some(e) = cause.downcast_ref::<SettingsError>() {
                return Some(settings_suggestion(e));
            }
            None
        })
    }

    fn resolve_suggestion(error: &ResolveError) -> String {
        match error {
            ResolveError::MissingFile { role, .. } => {
                format!("Check the path passed to {}", role.flag())
            }
            ResolveError::MultilineValue { field } => {
                format!("Remove the line breaks from the {field} value")
            }
        }
    }

    fn device_suggestion(error: &DeviceError) -> Option<String> {
        match error {
            DeviceError::NotFound { .. } | DeviceError::InvalidSelection { .. } => {
                Some("Run 'sdflash devices' to list available disks".to_string())
            }
            DeviceError::NoCandidates => {
                Some("Insert an SD card, or pass the device with --device".to_string())
            }
            DeviceError::NonInteractive => Some(
                "Pass the device with --device and skip the prompt with --force".to_string(),
            ),
            DeviceError::ToolFailed { tool, .. } => Some(format!(
                "Run 'sdflash doctor' to check that '{tool}' is installed, and retry with sudo if permission was denied"
            )),
            DeviceError::Cancelled => None,
        }
    }

    fn download_suggestion(error: &DownloadError) -> String {
        match error {
            DownloadError::NetworkError { .. } | DownloadError::MaxRetriesExceeded { .. } => {
                "Check your network connection and the image URL".to_string()
            }
            DownloadError::IoError { .. } => {
                "Check free space and permissions of the cache directory (SDFLASH_CACHE_DIR)"
                    .to_string()
            }
        }
    }

    fn image_suggestion(error: &ImageError) -> String {
        match error {
            ImageError::NotFound { .. } => "Check the image path or pass an http(s) URL".to_string(),
            ImageError::ChecksumMismatch { .. } => {
                "The image is corrupt or the --sha256 value is wrong; remove the cached copy and retry"
                    .to_string()
            }
            ImageError::Decompress { .. } => {
                "The archive may be truncated; download it again".to_string()
            }
        }
    }

    fn patch_suggestion(error: &PatchError) -> Option<String> {
        match error {
            PatchError::TargetMissing { .. } => {
                Some("Pass the directory the boot partition is mounted on".to_string())
            }
            PatchError::Copy { .. } | PatchError::Write { .. } => {
                Some("Check that the boot partition is mounted read-write".to_string())
            }
            PatchError::Read { .. } | PatchError::NoMatch { .. } => None,
        }
    }

    fn settings_suggestion(error: &SettingsError) -> String {
        match error {
            SettingsError::Read { path, .. } | SettingsError::Parse { path, .. } => {
                format!("Fix or remove {path}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FileRole, ResolveError};
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(16 * 1024 * 1024 * 1024), "16.00 GB");
    }

    #[test]
    fn test_paint_only_on_terminal() {
        assert_eq!(paint("31", "x", false), "x");
        assert_eq!(paint("31", "x", true), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn test_suggestion_found_through_context() {
        let error = anyhow::Error::new(ResolveError::MissingFile {
            role: FileRole::UserData,
            path: PathBuf::from("/nope"),
        })
        .context("Failed to resolve inputs");

        assert_eq!(
            suggestions::get_suggestion(&error).as_deref(),
            Some("Check the path passed to --userdata")
        );
    }

    #[test]
    fn test_no_suggestion_for_unknown_error() {
        assert!(suggestions::get_suggestion(&anyhow::anyhow!("boom")).is_none());
    }
}
