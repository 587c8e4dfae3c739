//! Block device tools
//!
//! Lists disks with `lsblk` and writes images with `dd`.

use std::path::Path;
use std::process::Command;

use crate::core::device::{parse_lsblk, BlockDevice, Imager};
use crate::error::DeviceError;
use crate::infra::command;

/// List whole disks, removable ones first
pub fn list_disks() -> Result<Vec<BlockDevice>, DeviceError> {
    let output = command::run(Command::new("lsblk").args([
        "--json",
        "-b",
        "-d",
        "-o",
        "NAME,SIZE,TYPE,RM,TRAN,MODEL",
    ]))?;

    parse_lsblk(&String::from_utf8_lossy(&output.stdout)).map_err(|e| DeviceError::ToolFailed {
        tool: "lsblk".to_string(),
        error: format!("unexpected output: {e}"),
    })
}

/// Images devices with `dd`
#[derive(Debug, Clone)]
pub struct DdImager {
    block_size: String,
}

impl DdImager {
    /// Create an imager writing blocks of `block_size` (a `dd` size like `4M`)
    pub fn new(block_size: &str) -> Self {
        Self {
            block_size: block_size.to_string(),
        }
    }

    /// Arguments passed to `dd`
    pub fn dd_args(&self, image: &Path, device: &Path) -> Vec<String> {
        vec![
            format!("if={}", image.display()),
            format!("of={}", device.display()),
            format!("bs={}", self.block_size),
            "conv=fsync".to_string(),
        ]
    }
}

impl Imager for DdImager {
    fn write_image(&self, image: &Path, device: &BlockDevice) -> Result<(), DeviceError> {
        tracing::info!("Writing {} to {}", image.display(), device.path.display());
        command::run(Command::new("dd").args(self.dd_args(image, &device.path)))?;
        command::run(&mut Command::new("sync"))?;

        if command::is_installed("partprobe") {
            // The kernel usually rereads the table on close; partprobe is a fallback.
            if let Err(e) = command::run(Command::new("partprobe").arg(&device.path)) {
                tracing::debug!("partprobe failed: {e}");
            }
        }
        Ok(())
    }
}
