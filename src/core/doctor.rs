//! Doctor command logic
//!
//! Checks that the external tools used for imaging and mounting are installed.

use std::path::PathBuf;

/// Result of a single tool check
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Tool name
    pub name: String,
    /// What the tool is used for
    pub purpose: String,
    /// Where the tool was found
    pub location: Option<PathBuf>,
    /// Whether this is a required or optional dependency
    pub required: bool,
}

impl CheckResult {
    /// Whether the tool was found
    pub fn passed(&self) -> bool {
        self.location.is_some()
    }

    /// Suggestion for fixing a failed check
    pub fn suggestion(&self) -> Option<String> {
        if self.passed() {
            return None;
        }
        let package = match self.name.as_str() {
            "dd" | "sync" => "coreutils",
            "mount" | "umount" | "lsblk" | "blkid" => "util-linux",
            "partprobe" => "parted",
            other => other,
        };
        Some(format!("Install '{package}' with your package manager"))
    }
}

/// Overall doctor report
#[derive(Debug, Default)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    /// Check if all required checks passed
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(CheckResult::passed)
    }

    /// Check if all checks passed (including optional)
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(CheckResult::passed)
    }

    /// Count passed checks
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed()).count()
    }

    /// Get all failed required checks
    pub fn failed_required(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed())
            .collect()
    }
}

/// Tools checked by `doctor`: name, purpose, required
pub const TOOLS: &[(&str, &str, bool)] = &[
    ("dd", "writes images", true),
    ("sync", "flushes writes", true),
    ("lsblk", "lists disks", true),
    ("blkid", "probes the boot filesystem", true),
    ("mount", "mounts the boot partition", true),
    ("umount", "unmounts the boot partition", true),
    ("unzip", "expands .zip images", false),
    ("partprobe", "rereads partition tables", false),
];

/// Run all checks, locating tools with `locate`
pub fn run_doctor_with(locate: impl Fn(&str) -> Option<PathBuf>) -> DoctorReport {
    DoctorReport {
        checks: TOOLS
            .iter()
            .map(|&(name, purpose, required)| CheckResult {
                name: name.to_string(),
                purpose: purpose.to_string(),
                location: locate(name),
                required,
            })
            .collect(),
    }
}

/// Run all checks against `PATH`
pub fn run_doctor() -> DoctorReport {
    run_doctor_with(|tool| which::which(tool).ok())
}
