//! Default configuration values

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Block size passed to `dd`
pub const DEFAULT_BLOCK_SIZE: &str = "4M";

/// Filesystem type assumed for the boot partition when probing fails
pub const DEFAULT_BOOT_FS_TYPE: &str = "vfat";

/// Seconds to wait for the kernel to pick up the new partition table
pub const DEFAULT_SETTLE_SECS: u64 = 3;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
