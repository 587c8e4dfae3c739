//! Mounting with the system `mount`/`umount` tools

use std::path::Path;
use std::process::Command;

use crate::core::device::Mounter;
use crate::error::DeviceError;
use crate::infra::command;

/// Mounts partitions with `mount -t` and probes them with `blkid`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounter;

impl Mounter for SystemMounter {
    fn probe_fs_type(&self, partition: &Path) -> Option<String> {
        let output = command::run(
            Command::new("blkid")
                .args(["-o", "value", "-s", "TYPE"])
                .arg(partition),
        )
        .map_err(|e| tracing::debug!("blkid failed: {e}"))
        .ok()?;

        let fs_type = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!fs_type.is_empty()).then_some(fs_type)
    }

    fn mount(&self, partition: &Path, fs_type: &str, mount_point: &Path) -> Result<(), DeviceError> {
        tracing::info!(
            "Mounting {} ({fs_type}) at {}",
            partition.display(),
            mount_point.display()
        );
        command::run(
            Command::new("mount")
                .args(["-t", fs_type])
                .arg(partition)
                .arg(mount_point),
        )
        .map(|_| ())
    }

    fn unmount(&self, mount_point: &Path) -> Result<(), DeviceError> {
        tracing::info!("Unmounting {}", mount_point.display());
        command::run(Command::new("umount").arg(mount_point)).map(|_| ())
    }
}
