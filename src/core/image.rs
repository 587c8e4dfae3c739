//! Source image classification
//!
//! An image argument is either a local file or an `http(s)` URL, and either
//! a raw disk image or a compressed one. Compressed images are expanded into
//! the cache directory before imaging.

use std::path::{Path, PathBuf};

use crate::error::ImageError;

/// Where the image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on the local machine
    Local(PathBuf),
    /// An `http://` or `https://` URL
    Remote(String),
}

impl ImageSource {
    /// Classify a command-line image argument
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Remote(arg.to_string())
        } else {
            Self::Local(PathBuf::from(arg))
        }
    }

    /// File name the image is stored under
    pub fn file_name(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_name()
                .map_or_else(|| "image.img".to_string(), |n| n.to_string_lossy().to_string()),
            Self::Remote(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/')
                    .next()
                    .filter(|name| !name.is_empty())
                    .unwrap_or("image.img")
                    .to_string()
            }
        }
    }
}

/// Compression wrapper around a disk image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Raw image
    None,
    /// gzip (`.gz`)
    Gzip,
    /// xz (`.xz`)
    Xz,
    /// zip archive (`.zip`)
    Zip,
}

impl Compression {
    /// Detect compression from the file extension
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("gz") => Self::Gzip,
            Some("xz") => Self::Xz,
            Some("zip") => Self::Zip,
            _ => Self::None,
        }
    }

    /// Name of the expanded image for a compressed `file_name`
    ///
    /// `os.img.xz` becomes `os.img`; archives without an inner `.img`
    /// extension get one, so `os.zip` becomes `os.img`.
    pub fn expanded_name(self, file_name: &str) -> String {
        let stem = match self {
            Self::None => return file_name.to_string(),
            Self::Gzip => strip_suffix_ci(file_name, ".gz"),
            Self::Xz => strip_suffix_ci(file_name, ".xz"),
            Self::Zip => strip_suffix_ci(file_name, ".zip"),
        };
        if stem.to_ascii_lowercase().ends_with(".img") {
            stem.to_string()
        } else {
            format!("{stem}.img")
        }
    }
}

fn strip_suffix_ci<'a>(name: &'a str, suffix: &str) -> &'a str {
    if name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &name[..name.len() - suffix.len()]
    } else {
        name
    }
}

/// Compare a computed SHA-256 against the expected one, ignoring case
pub fn verify_checksum(file: &Path, actual: &str, expected: &str) -> Result<(), ImageError> {
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(ImageError::ChecksumMismatch {
            file: file.display().to_string(),
            expected: expected.trim().to_lowercase(),
            actual: actual.to_string(),
        })
    }
}
