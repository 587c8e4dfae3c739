//! Source image preparation
//!
//! Turns an image argument into a raw image file on local disk: downloads
//! remote images into the cache, verifies an optional checksum and expands
//! compressed images.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use xz2::read::XzDecoder;

use crate::core::image::{verify_checksum, Compression, ImageSource};
use crate::error::{DownloadError, ImageError};
use crate::infra::command;
use crate::infra::download::{file_checksum, DownloadManager, ProgressCallback};
use crate::infra::filesystem;

/// A raw image ready to be written
#[derive(Debug)]
pub struct PreparedImage {
    /// Raw image file
    pub path: PathBuf,
    /// Intermediate files that may be removed after flashing
    pub scratch: Vec<PathBuf>,
}

impl PreparedImage {
    /// Remove intermediate files
    pub fn cleanup(&self) {
        for path in &self.scratch {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!("Could not remove {}: {e}", path.display());
            }
        }
    }
}

/// Options for [`prepare`]
pub struct PrepareOptions<'a> {
    /// Where downloads and expanded images go
    pub cache_dir: &'a Path,
    /// Expected SHA-256 of the source as given (before expansion)
    pub sha256: Option<&'a str>,
    /// Whether downloaded and expanded files are kept afterwards
    pub keep: bool,
    /// Download manager for remote sources
    pub downloader: &'a DownloadManager,
    /// Progress callback for downloads
    pub progress: Option<ProgressCallback>,
}

/// Make `source` available as a raw image file
pub async fn prepare(source: &ImageSource, options: PrepareOptions<'_>) -> anyhow::Result<PreparedImage> {
    let mut scratch = Vec::new();

    let source_path = match source {
        ImageSource::Local(path) => {
            if !path.is_file() {
                return Err(ImageError::NotFound { path: path.clone() }.into());
            }
            if let Some(expected) = options.sha256 {
                verify_checksum(path, &file_checksum(path)?, expected)?;
            }
            path.clone()
        }
        ImageSource::Remote(url) => {
            filesystem::create_dir_all(options.cache_dir)?;
            let dest = options.cache_dir.join(source.file_name());
            if dest.is_file() && cached_copy_is_valid(&dest, options.sha256)? {
                tracing::info!("Using cached {}", dest.display());
            } else {
                tracing::info!("Downloading {url}");
                let result = options
                    .downloader
                    .download(url, &dest, options.progress)
                    .await?;
                if let Some(expected) = options.sha256 {
                    if let Err(e) = verify_checksum(&dest, &result.checksum, expected) {
                        let _ = std::fs::remove_file(&dest);
                        return Err(e.into());
                    }
                }
            }
            if !options.keep {
                scratch.push(dest.clone());
            }
            dest
        }
    };

    let compression = Compression::detect(&source_path);
    if compression == Compression::None {
        return Ok(PreparedImage {
            path: source_path,
            scratch,
        });
    }

    filesystem::create_dir_all(options.cache_dir)?;
    let file_name = source_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source.file_name());
    let expanded = options.cache_dir.join(compression.expanded_name(&file_name));
    tracing::info!("Decompressing {} to {}", source_path.display(), expanded.display());
    decompress(&source_path, compression, &expanded)?;
    if !options.keep {
        scratch.push(expanded.clone());
    }

    Ok(PreparedImage {
        path: expanded,
        scratch,
    })
}

fn cached_copy_is_valid(path: &Path, sha256: Option<&str>) -> Result<bool, DownloadError> {
    match sha256 {
        Some(expected) => Ok(file_checksum(path)?.eq_ignore_ascii_case(expected.trim())),
        None => Ok(true),
    }
}

/// Expand `source` into `dest`
pub fn decompress(source: &Path, compression: Compression, dest: &Path) -> Result<(), ImageError> {
    let err = |e: io::Error| ImageError::Decompress {
        path: source.to_path_buf(),
        error: e.to_string(),
    };

    match compression {
        Compression::None => {
            std::fs::copy(source, dest).map_err(err)?;
        }
        Compression::Gzip => {
            let input = File::open(source).map_err(err)?;
            let mut reader = GzDecoder::new(BufReader::new(input));
            let mut output = File::create(dest).map_err(err)?;
            io::copy(&mut reader, &mut output).map_err(err)?;
        }
        Compression::Xz => {
            let input = File::open(source).map_err(err)?;
            let mut reader = XzDecoder::new(BufReader::new(input));
            let mut output = File::create(dest).map_err(err)?;
            io::copy(&mut reader, &mut output).map_err(err)?;
        }
        Compression::Zip => unzip_image(source, dest)?,
    }
    Ok(())
}

/// Extract the first `.img` member of a zip archive with `unzip`
fn unzip_image(archive: &Path, dest: &Path) -> Result<(), ImageError> {
    let decompress_err = |error: String| ImageError::Decompress {
        path: archive.to_path_buf(),
        error,
    };

    let listing = command::run(Command::new("unzip").arg("-Z1").arg(archive))
        .map_err(|e| decompress_err(e.to_string()))?;
    let listing = String::from_utf8_lossy(&listing.stdout);
    let member = listing
        .lines()
        .find(|name| name.to_ascii_lowercase().ends_with(".img"))
        .or_else(|| listing.lines().find(|name| !name.ends_with('/')))
        .ok_or_else(|| decompress_err("archive contains no image".to_string()))?
        .to_string();

    let output = File::create(dest).map_err(|e| decompress_err(e.to_string()))?;
    let status = Command::new("unzip")
        .arg("-p")
        .arg(archive)
        .arg(&member)
        .stdout(Stdio::from(output))
        .status()
        .map_err(|e| decompress_err(format!("unzip: {e}")))?;

    if !status.success() {
        return Err(decompress_err(format!("unzip exited with {status}")));
    }
    Ok(())
}
