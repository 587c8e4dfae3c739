//! Error types for sdflash
//!
//! Domain-specific error types using thiserror.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Logical role of a user-supplied override file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// Legacy `device-init.yaml` / `occidentalis.txt` source (`--config`)
    LegacyConfig,
    /// Firmware `config.txt` replacement (`--bootconf`)
    BootConf,
    /// cloud-init user-data (`--userdata`)
    UserData,
    /// cloud-init meta-data (`--metadata`)
    MetaData,
}

impl FileRole {
    /// Name of the role as shown to the user
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyConfig => "legacy-config",
            Self::BootConf => "boot-conf",
            Self::UserData => "user-data",
            Self::MetaData => "meta-data",
        }
    }

    /// Command-line flag that supplies a file for this role
    pub fn flag(self) -> &'static str {
        match self {
            Self::LegacyConfig => "--config",
            Self::BootConf => "--bootconf",
            Self::UserData => "--userdata",
            Self::MetaData => "--metadata",
        }
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input validation errors, raised before anything is written
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A supplied override file does not exist or cannot be read
    #[error("{role} file not found or not readable: {path}")]
    MissingFile { role: FileRole, path: PathBuf },

    /// A field value spans more than one line
    #[error("The {field} value must be a single line")]
    MultilineValue { field: String },
}

/// Boot partition patching errors
#[derive(Error, Debug)]
pub enum PatchError {
    /// Target directory does not exist
    #[error("Boot partition directory not found: {path}")]
    TargetMissing { path: PathBuf },

    /// Copying an override file failed
    #[error("Failed to copy '{source_path}' to '{dest}': {error}")]
    Copy {
        source_path: PathBuf,
        dest: PathBuf,
        error: String,
    },

    /// Reading a config file on the partition failed
    #[error("Failed to read '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Writing a config file on the partition failed
    #[error("Failed to write '{path}': {error}")]
    Write { path: PathBuf, error: String },

    /// No line carried the requested key (non-fatal, reported only)
    #[error("No '{key}' line found in {file}, {field} left unchanged")]
    NoMatch {
        file: String,
        key: String,
        field: String,
    },
}

impl PatchError {
    /// Whether the error aborts the patch sequence
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoMatch { .. })
    }
}

/// Block device errors
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Device path does not exist
    #[error("Device not found: {path}")]
    NotFound { path: PathBuf },

    /// No candidate disks were found
    #[error("No disks found to flash")]
    NoCandidates,

    /// Selection requires a terminal
    #[error("Cannot select a device in non-interactive mode")]
    NonInteractive,

    /// User gave an invalid selection
    #[error("Invalid device selection: '{input}'")]
    InvalidSelection { input: String },

    /// User declined the confirmation prompt
    #[error("Flash cancelled by user")]
    Cancelled,

    /// External tool failed
    #[error("'{tool}' failed: {error}")]
    ToolFailed { tool: String, error: String },
}

/// Source image errors
#[derive(Error, Debug)]
pub enum ImageError {
    /// Image file not found
    #[error("Image not found: {path}")]
    NotFound { path: PathBuf },

    /// Checksum mismatch
    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// Decompression failed
    #[error("Failed to decompress '{path}': {error}")]
    Decompress { path: PathBuf, error: String },
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Max retries exceeded
    #[error("Download failed after {retries} retries: {url}")]
    MaxRetriesExceeded { url: String, retries: u32 },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

impl From<FilesystemError> for PatchError {
    fn from(err: FilesystemError) -> Self {
        match err {
            FilesystemError::ReadFile { path, error } => Self::Read { path, error },
            FilesystemError::CopyFile { from, to, error } => Self::Copy {
                source_path: from,
                dest: to,
                error,
            },
            FilesystemError::CreateDir { path, error } | FilesystemError::WriteFile { path, error } => {
                Self::Write { path, error }
            }
        }
    }
}
