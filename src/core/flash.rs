//! Flash orchestration
//!
//! Images a device and provisions its boot partition:
//! select device → confirm → write image → mount boot partition →
//! patch → unmount. The provisioning request must already be resolved, so
//! missing input files are reported before the device is touched.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use super::device::{
    boot_partition_path, confirm_overwrite, BlockDevice, DeviceSelector, Imager, MountGuard,
    Mounter,
};
use super::patcher::{ConfigPatcher, PatchReport};
use super::request::ProvisioningRequest;
use crate::config::defaults;
use crate::error::DeviceError;

/// Confirmation hook called before the device is overwritten
pub type ConfirmFn<'a> = Box<dyn Fn(&BlockDevice) -> Result<(), DeviceError> + 'a>;

/// Flash options from CLI and settings
#[derive(Debug, Clone)]
pub struct FlashOptions {
    /// Skip confirmation prompt
    pub force: bool,
    /// Boot partition filesystem type, probed when unset
    pub fs_type: Option<String>,
    /// Wait between imaging and mounting
    pub settle: Duration,
}

impl Default for FlashOptions {
    fn default() -> Self {
        Self {
            force: false,
            fs_type: None,
            settle: Duration::from_secs(defaults::DEFAULT_SETTLE_SECS),
        }
    }
}

/// Result of a flash operation
#[derive(Debug)]
pub struct FlashResult {
    /// Device written to
    pub device: BlockDevice,
    /// Image written
    pub image: PathBuf,
    /// Boot partition that was provisioned
    pub boot_partition: PathBuf,
    /// Filesystem type the boot partition was mounted with
    pub fs_type: String,
    /// What the patcher did
    pub patch: PatchReport,
}

/// Flash executor
pub struct FlashExecutor<'a> {
    selector: &'a dyn DeviceSelector,
    imager: &'a dyn Imager,
    mounter: &'a dyn Mounter,
    confirm: ConfirmFn<'a>,
}

impl<'a> FlashExecutor<'a> {
    /// Create a new flash executor that confirms on the terminal
    pub fn new(
        selector: &'a dyn DeviceSelector,
        imager: &'a dyn Imager,
        mounter: &'a dyn Mounter,
    ) -> Self {
        Self {
            selector,
            imager,
            mounter,
            confirm: Box::new(confirm_on_terminal),
        }
    }

    /// Replace the confirmation hook
    #[must_use]
    pub fn with_confirmation(mut self, confirm: ConfirmFn<'a>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Execute the flash
    pub fn execute(
        &self,
        image: &Path,
        request: &ProvisioningRequest,
        options: &FlashOptions,
    ) -> Result<FlashResult> {
        let device = self.selector.select()?;

        // Require confirmation unless --force is specified
        if !options.force {
            (self.confirm)(&device)?;
        }

        self.imager
            .write_image(image, &device)
            .with_context(|| format!("Failed to write image to {}", device.path.display()))?;

        if !options.settle.is_zero() {
            tracing::debug!("Waiting {:?} for partitions to settle", options.settle);
            std::thread::sleep(options.settle);
        }

        let boot_partition = boot_partition_path(&device.path);
        let fs_type = options
            .fs_type
            .clone()
            .or_else(|| self.mounter.probe_fs_type(&boot_partition))
            .unwrap_or_else(|| defaults::DEFAULT_BOOT_FS_TYPE.to_string());

        let mount_dir = tempfile::Builder::new()
            .prefix("sdflash-boot-")
            .tempdir()
            .context("Failed to create mount point")?;

        let mounted = MountGuard::mount(self.mounter, &boot_partition, &fs_type, mount_dir.path())
            .with_context(|| format!("Failed to mount {}", boot_partition.display()))?;

        let patch = ConfigPatcher::new(mounted.path()).apply(request);

        // Unmount before the patch result is looked at. A mount point that is
        // still in use must not be cleaned up with the temp dir, or the
        // partition contents would be deleted with it.
        if let Err(e) = mounted.unmount() {
            let mount_point = mount_dir.into_path();
            return Err(anyhow::Error::new(e).context(format!(
                "Failed to unmount {} from {}",
                boot_partition.display(),
                mount_point.display()
            )));
        }

        let patch = patch.context("Failed to provision boot partition")?;

        Ok(FlashResult {
            device,
            image: image.to_path_buf(),
            boot_partition,
            fs_type,
            patch,
        })
    }
}

/// Ask on the terminal; fail when there is none
pub fn confirm_on_terminal(device: &BlockDevice) -> Result<(), DeviceError> {
    if !io::stdin().is_terminal() {
        return Err(DeviceError::NonInteractive);
    }
    confirm_overwrite(device, &mut io::stdin().lock(), &mut io::stderr())
}
