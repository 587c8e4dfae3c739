//! CLI command implementation for `sdflash flash`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::output::{
    create_download_bar, create_spinner, print_info, print_success, FlashSummary,
};
use crate::core::device::{BlockDevice, DeviceSelector, ExplicitDevice, Imager, InteractiveSelector};
use crate::core::flash::{FlashExecutor, FlashOptions};
use crate::core::image::ImageSource;
use crate::core::request::ProvisioningInputs;
use crate::core::settings::Settings;
use crate::error::DeviceError;
use crate::infra::dirs::SdflashDirs;
use crate::infra::disk::{list_disks, DdImager};
use crate::infra::download::{DownloadManager, ProgressCallback};
use crate::infra::image::{prepare, PrepareOptions};
use crate::infra::mount::SystemMounter;

/// Flash-only arguments
#[derive(Debug, Clone)]
pub struct FlashArgs {
    /// Image path or URL
    pub image: String,
    /// Explicit target device
    pub device: Option<PathBuf>,
    /// Skip confirmation
    pub force: bool,
    /// Expected SHA-256 of the image
    pub sha256: Option<String>,
    /// Boot partition filesystem type
    pub fs_type: Option<String>,
}

/// Shows a spinner while the wrapped imager runs
struct ProgressImager<'a> {
    inner: &'a dyn Imager,
}

impl Imager for ProgressImager<'_> {
    fn write_image(&self, image: &Path, device: &BlockDevice) -> Result<(), DeviceError> {
        let spinner = create_spinner(&format!("Writing image to {}...", device.path.display()));
        let result = self.inner.write_image(image, device);
        spinner.finish_and_clear();
        result
    }
}

/// Execute the flash command
pub async fn execute(args: FlashArgs, inputs: ProvisioningInputs) -> Result<()> {
    let dirs = SdflashDirs::new();
    let settings = Settings::load(&dirs)?;

    // Missing override files are reported before anything is downloaded or written
    let request = inputs.with_defaults(&settings.provision).resolve()?;

    let selector: Box<dyn DeviceSelector> = match &args.device {
        Some(path) => Box::new(ExplicitDevice::new(path)),
        None => Box::new(InteractiveSelector::new(
            list_disks().context("Failed to list disks")?,
        )),
    };

    let downloader = DownloadManager::with_config(settings.max_retries(), 1000);
    let bar = create_download_bar(0);
    let progress_bar = bar.clone();
    let progress: ProgressCallback = Box::new(move |downloaded, total| {
        if total > 0 {
            progress_bar.set_length(total);
        }
        progress_bar.set_position(downloaded);
    });

    let source = ImageSource::parse(&args.image);
    let images_dir = dirs.images_dir();
    let prepared = prepare(
        &source,
        PrepareOptions {
            cache_dir: &images_dir,
            sha256: args.sha256.as_deref(),
            keep: settings.keep_downloads(),
            downloader: &downloader,
            progress: Some(progress),
        },
    )
    .await;
    bar.finish_and_clear();
    let prepared = prepared.with_context(|| format!("Failed to prepare image '{}'", args.image))?;

    print_info(&format!("Using image {}", prepared.path.display()));

    let dd = DdImager::new(settings.block_size());
    let imager = ProgressImager { inner: &dd };
    let mounter = SystemMounter;
    let options = FlashOptions {
        force: args.force,
        fs_type: args.fs_type.or_else(|| settings.flash.boot_fs_type.clone()),
        settle: settings.settle_delay(),
    };

    let summary = FlashExecutor::new(selector.as_ref(), &imager, &mounter)
        .execute(&prepared.path, &request, &options)
        .map(|result| FlashSummary::from_result(&result));
    prepared.cleanup();

    summary?.print();
    print_success("Finished");
    Ok(())
}
