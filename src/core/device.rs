//! Target devices and the collaborators that act on them
//!
//! Device selection, imaging and mounting are capabilities passed into the
//! flash executor, so the provisioning logic never reaches for a global
//! "current device" and can be exercised against plain directories.

use serde::Deserialize;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::cli::output::format_size;
use crate::error::DeviceError;

/// A whole-disk block device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    /// Device node, e.g. `/dev/sdb`
    pub path: PathBuf,
    /// Size in bytes, if known
    pub size: Option<u64>,
    /// Hardware model, if known
    pub model: Option<String>,
    /// Transport (`usb`, `mmc`, `sata`, ...)
    pub transport: Option<String>,
    /// Whether the kernel reports the medium as removable
    pub removable: bool,
}

impl BlockDevice {
    /// A device known only by its path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: None,
            model: None,
            transport: None,
            removable: false,
        }
    }
}

impl fmt::Display for BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(size) = self.size {
            write!(f, " ({})", format_size(size))?;
        }
        if let Some(model) = self.model.as_deref().filter(|m| !m.is_empty()) {
            write!(f, " {model}")?;
        }
        if let Some(transport) = &self.transport {
            write!(f, " [{transport}]")?;
        }
        if self.removable {
            f.write_str(" removable")?;
        }
        Ok(())
    }
}

/// Path of the first partition (the boot partition) of `device`
///
/// Kernel naming appends the partition number directly (`sdb` → `sdb1`),
/// except for devices whose name already ends in a digit, which get a `p`
/// separator (`mmcblk0` → `mmcblk0p1`, `nvme0n1` → `nvme0n1p1`).
pub fn boot_partition_path(device: &Path) -> PathBuf {
    let name = device.as_os_str().to_string_lossy();
    if name.ends_with(|c: char| c.is_ascii_digit()) {
        PathBuf::from(format!("{name}p1"))
    } else {
        PathBuf::from(format!("{name}1"))
    }
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    rm: bool,
    #[serde(default)]
    tran: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// `lsblk` prints numbers as strings on older util-linux releases
fn lenient_u64<'de, D: serde::Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: serde::Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_u64() == Some(1),
        serde_json::Value::String(s) => s == "1" || s == "true",
        _ => false,
    })
}

/// Parse `lsblk --json -b -d -o NAME,SIZE,TYPE,RM,TRAN,MODEL` output
///
/// Only whole disks are kept; removable ones sort first.
pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>, serde_json::Error> {
    let output: LsblkOutput = serde_json::from_str(json)?;
    let mut devices: Vec<_> = output
        .blockdevices
        .into_iter()
        .filter(|d| d.kind.as_deref().map_or(true, |kind| kind == "disk"))
        .map(|d| BlockDevice {
            path: Path::new("/dev").join(&d.name),
            size: d.size,
            model: d.model.map(|m| m.trim().to_string()),
            transport: d.tran,
            removable: d.rm,
        })
        .collect();
    devices.sort_by_key(|d| !d.removable);
    Ok(devices)
}

/// Picks the device to flash
pub trait DeviceSelector {
    /// Return the device to write to
    fn select(&self) -> Result<BlockDevice, DeviceError>;
}

/// A device given explicitly with `--device`
#[derive(Debug, Clone)]
pub struct ExplicitDevice {
    path: PathBuf,
}

impl ExplicitDevice {
    /// Select `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceSelector for ExplicitDevice {
    fn select(&self) -> Result<BlockDevice, DeviceError> {
        if !self.path.exists() {
            return Err(DeviceError::NotFound {
                path: self.path.clone(),
            });
        }
        Ok(BlockDevice::from_path(&self.path))
    }
}

/// Ask on the terminal which of the candidate disks to use
#[derive(Debug, Clone)]
pub struct InteractiveSelector {
    candidates: Vec<BlockDevice>,
}

impl InteractiveSelector {
    /// Offer `candidates` to the user
    pub fn new(candidates: Vec<BlockDevice>) -> Self {
        Self { candidates }
    }
}

impl DeviceSelector for InteractiveSelector {
    fn select(&self) -> Result<BlockDevice, DeviceError> {
        use std::io::IsTerminal;

        if !std::io::stdin().is_terminal() {
            return Err(DeviceError::NonInteractive);
        }
        let stdin = std::io::stdin();
        choose_device(&self.candidates, &mut stdin.lock(), &mut std::io::stderr())
    }
}

/// Print a numbered device menu to `output` and read the choice from `input`
///
/// Accepts either the menu number or the device path.
pub fn choose_device(
    candidates: &[BlockDevice],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<BlockDevice, DeviceError> {
    if candidates.is_empty() {
        return Err(DeviceError::NoCandidates);
    }

    let io_err = |e: std::io::Error| DeviceError::ToolFailed {
        tool: "terminal".to_string(),
        error: e.to_string(),
    };

    writeln!(output, "Available disks:").map_err(io_err)?;
    for (idx, device) in candidates.iter().enumerate() {
        writeln!(output, "  {}) {device}", idx + 1).map_err(io_err)?;
    }
    write!(output, "Which disk should be flashed? [1-{}] ", candidates.len()).map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(io_err)?;
    let answer = answer.trim();

    let by_index = answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| candidates.get(idx));
    let by_path = || candidates.iter().find(|d| d.path == Path::new(answer));

    by_index
        .or_else(by_path)
        .cloned()
        .ok_or_else(|| DeviceError::InvalidSelection {
            input: answer.to_string(),
        })
}

/// Ask for confirmation before a destructive write
pub fn confirm_overwrite(
    device: &BlockDevice,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<(), DeviceError> {
    let io_err = |e: std::io::Error| DeviceError::ToolFailed {
        tool: "terminal".to_string(),
        error: e.to_string(),
    };

    writeln!(output).map_err(io_err)?;
    writeln!(output, "⚠️  WARNING: This will erase everything on {device}!").map_err(io_err)?;
    write!(output, "   Are you sure you want to continue? [y/N] ").map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut answer = String::new();
    input.read_line(&mut answer).map_err(io_err)?;
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(DeviceError::Cancelled),
    }
}

/// Writes an image to a block device
pub trait Imager {
    /// Copy `image` onto `device` and make the new partitions visible
    fn write_image(&self, image: &Path, device: &BlockDevice) -> Result<(), DeviceError>;
}

/// Mounts and unmounts partitions
pub trait Mounter {
    /// Filesystem type of `partition`, if it can be determined
    fn probe_fs_type(&self, partition: &Path) -> Option<String>;

    /// Mount `partition` with `fs_type` at `mount_point`
    fn mount(&self, partition: &Path, fs_type: &str, mount_point: &Path) -> Result<(), DeviceError>;

    /// Unmount whatever is mounted at `mount_point`
    fn unmount(&self, mount_point: &Path) -> Result<(), DeviceError>;
}

/// A mounted partition, unmounted when dropped
///
/// Call [`MountGuard::unmount`] to observe unmount failures; the drop path
/// only logs them.
pub struct MountGuard<'a> {
    mounter: &'a dyn Mounter,
    mount_point: PathBuf,
    mounted: bool,
}

impl<'a> MountGuard<'a> {
    /// Mount `partition` and return a guard for it
    pub fn mount(
        mounter: &'a dyn Mounter,
        partition: &Path,
        fs_type: &str,
        mount_point: &Path,
    ) -> Result<Self, DeviceError> {
        mounter.mount(partition, fs_type, mount_point)?;
        Ok(Self {
            mounter,
            mount_point: mount_point.to_path_buf(),
            mounted: true,
        })
    }

    /// Directory the partition is mounted at
    pub fn path(&self) -> &Path {
        &self.mount_point
    }

    /// Unmount now and report the result
    pub fn unmount(mut self) -> Result<(), DeviceError> {
        self.mounted = false;
        self.mounter.unmount(&self.mount_point)
    }
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        if self.mounted {
            if let Err(e) = self.mounter.unmount(&self.mount_point) {
                tracing::warn!("Failed to unmount {}: {e}", self.mount_point.display());
            }
        }
    }
}
