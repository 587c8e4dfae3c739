//! Boot partition patching
//!
//! Reconciles a mounted boot partition with a [`ProvisioningRequest`]:
//!
//! 1. Override files are copied verbatim, replacing their destinations.
//! 2. An empty `meta-data` is created next to `user-data` when missing,
//!    since cloud-init ignores a NoCloud datasource without it.
//! 3. Requested fields are substituted into `device-init.yaml`,
//!    `user-data` and `occidentalis.txt`, whichever exist.
//!
//! The steps run in that order so substitutions apply on top of copied
//! files. Every step is idempotent, so a partially patched partition can be
//! fixed by running the patcher again.

use std::path::{Path, PathBuf};

use crate::core::line_format::{
    ConfigDocument, DeviceInit, DeviceInitKey, LineFormat, Occidentalis, OccidentalisKey,
    UserData, UserDataKey,
};
use crate::core::request::{Field, ProvisioningRequest};
use crate::error::{FileRole, PatchError};
use crate::infra::filesystem;

/// Firmware boot configuration file
pub const BOOT_CONF_FILE: &str = "config.txt";

/// cloud-init meta-data file
pub const META_DATA_FILE: &str = "meta-data";

/// Destination name for a legacy config source
///
/// Sources whose file name contains `occi` are Occidentalis configs,
/// everything else is treated as `device-init.yaml`.
pub fn legacy_destination(source: &Path) -> &'static str {
    let is_occidentalis = source
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains("occi"));
    if is_occidentalis {
        Occidentalis::FILE_NAME
    } else {
        DeviceInit::FILE_NAME
    }
}

/// Destination file name on the boot partition for an override file
pub fn destination_for(role: FileRole, source: &Path) -> &'static str {
    match role {
        FileRole::LegacyConfig => legacy_destination(source),
        FileRole::BootConf => BOOT_CONF_FILE,
        FileRole::UserData => UserData::FILE_NAME,
        FileRole::MetaData => META_DATA_FILE,
    }
}

/// A file copied onto the partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    /// Role of the source
    pub role: FileRole,
    /// Destination path
    pub dest: PathBuf,
    /// Bytes copied
    pub bytes: u64,
}

/// A field written into a config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// File name on the partition
    pub file: &'static str,
    /// Field that was set
    pub field: Field,
    /// Number of lines rewritten
    pub lines: usize,
}

/// What a patch run did
#[derive(Debug, Default)]
pub struct PatchReport {
    /// Override files copied
    pub copied: Vec<CopiedFile>,
    /// Whether an empty `meta-data` was created
    pub created_meta_data: bool,
    /// Fields substituted
    pub substitutions: Vec<Substitution>,
    /// Fields that found no line to rewrite
    pub unmatched: Vec<PatchError>,
}

/// One requested line rewrite
struct Edit<'a, K> {
    key: K,
    field: Field,
    value: &'a str,
    /// Rewrites done on behalf of another field are not reported
    implied: bool,
}

/// Applies a provisioning request to a boot partition directory
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    boot_dir: PathBuf,
}

impl ConfigPatcher {
    /// Create a patcher for the partition mounted at `boot_dir`
    pub fn new(boot_dir: &Path) -> Self {
        Self {
            boot_dir: boot_dir.to_path_buf(),
        }
    }

    /// Run every patch step in order
    ///
    /// Fatal errors abort the remaining steps; unmatched substitutions are
    /// collected in the report.
    pub fn apply(&self, request: &ProvisioningRequest) -> Result<PatchReport, PatchError> {
        if !self.boot_dir.is_dir() {
            return Err(PatchError::TargetMissing {
                path: self.boot_dir.clone(),
            });
        }

        let mut report = PatchReport::default();
        self.copy_overrides(request, &mut report)?;
        report.created_meta_data = self.ensure_meta_data()?;
        self.patch_device_init(request, &mut report)?;
        self.patch_user_data(request, &mut report)?;
        self.patch_occidentalis(request, &mut report)?;

        for note in &report.unmatched {
            tracing::warn!("{note}");
        }

        Ok(report)
    }

    /// Copy every supplied override file to its destination
    fn copy_overrides(
        &self,
        request: &ProvisioningRequest,
        report: &mut PatchReport,
    ) -> Result<(), PatchError> {
        for (role, source) in request.override_files() {
            let dest = self.boot_dir.join(destination_for(role, source));
            tracing::info!("Copying {} to {}", source.display(), dest.display());
            let bytes = filesystem::copy_file(source, &dest)?;
            report.copied.push(CopiedFile { role, dest, bytes });
        }
        Ok(())
    }

    /// Create an empty `meta-data` when `user-data` exists without one
    fn ensure_meta_data(&self) -> Result<bool, PatchError> {
        let user_data = self.boot_dir.join(UserData::FILE_NAME);
        let meta_data = self.boot_dir.join(META_DATA_FILE);

        if user_data.exists() && !meta_data.exists() {
            tracing::info!("Creating empty {}", meta_data.display());
            filesystem::write_file(&meta_data, b"")?;
            return Ok(true);
        }
        Ok(false)
    }

    fn patch_device_init(
        &self,
        request: &ProvisioningRequest,
        report: &mut PatchReport,
    ) -> Result<(), PatchError> {
        let mut edits = Vec::new();
        if let Some(value) = request.field(Field::Hostname) {
            edits.push(Edit::new(DeviceInitKey::Hostname, Field::Hostname, value));
        }
        // Setting either WiFi credential also normalizes the wlan0 block opener.
        if let Some(value) = request.field(Field::WifiSsid) {
            edits.push(Edit::implied(DeviceInitKey::Wlan0, Field::WifiSsid));
            edits.push(Edit::new(DeviceInitKey::Ssid, Field::WifiSsid, value));
        }
        if let Some(value) = request.field(Field::WifiPassword) {
            edits.push(Edit::implied(DeviceInitKey::Wlan0, Field::WifiPassword));
            edits.push(Edit::new(DeviceInitKey::Password, Field::WifiPassword, value));
        }
        if let Some(value) = request.field(Field::ClusterLab) {
            edits.push(Edit::new(DeviceInitKey::RunOnBoot, Field::ClusterLab, value));
        }
        self.patch_file::<DeviceInit>(&edits, report)
    }

    fn patch_user_data(
        &self,
        request: &ProvisioningRequest,
        report: &mut PatchReport,
    ) -> Result<(), PatchError> {
        let mut edits = Vec::new();
        if let Some(value) = request.field(Field::Hostname) {
            edits.push(Edit::new(UserDataKey::Hostname, Field::Hostname, value));
        }
        self.patch_file::<UserData>(&edits, report)
    }

    fn patch_occidentalis(
        &self,
        request: &ProvisioningRequest,
        report: &mut PatchReport,
    ) -> Result<(), PatchError> {
        let edits: Vec<_> = [
            (OccidentalisKey::Hostname, Field::Hostname),
            (OccidentalisKey::WifiSsid, Field::WifiSsid),
            (OccidentalisKey::WifiPassword, Field::WifiPassword),
        ]
        .into_iter()
        .filter_map(|(key, field)| request.field(field).map(|value| Edit::new(key, field, value)))
        .collect();
        self.patch_file::<Occidentalis>(&edits, report)
    }

    /// Apply `edits` to the file of format `F`, if it exists on the partition
    fn patch_file<F: LineFormat>(
        &self,
        edits: &[Edit<'_, F::Key>],
        report: &mut PatchReport,
    ) -> Result<(), PatchError> {
        let path = self.boot_dir.join(F::FILE_NAME);
        if edits.is_empty() || !path.is_file() {
            return Ok(());
        }

        let original = filesystem::read_file(&path)?;
        let mut document = ConfigDocument::<F>::parse(&original);

        for edit in edits {
            let lines = document.set(edit.key, edit.value);
            if edit.implied {
                continue;
            }
            if lines == 0 {
                report.unmatched.push(PatchError::NoMatch {
                    file: F::FILE_NAME.to_string(),
                    key: F::token(edit.key).to_string(),
                    field: edit.field.to_string(),
                });
            } else {
                tracing::info!("Setting {} in {}", edit.field, F::FILE_NAME);
                report.substitutions.push(Substitution {
                    file: F::FILE_NAME,
                    field: edit.field,
                    lines,
                });
            }
        }

        let patched = document.to_bytes();
        if patched != original {
            filesystem::write_file(&path, &patched)?;
        }
        Ok(())
    }
}

impl<'a, K> Edit<'a, K> {
    fn new(key: K, field: Field, value: &'a str) -> Self {
        Self {
            key,
            field,
            value,
            implied: false,
        }
    }

    fn implied(key: K, field: Field) -> Self {
        Self {
            key,
            field,
            value: "",
            implied: true,
        }
    }
}
