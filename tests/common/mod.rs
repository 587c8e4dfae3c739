//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test boot partition context
///
/// Creates a temporary directory standing in for a mounted boot partition,
/// plus a separate directory for the override files passed on the command
/// line.
pub struct TestProject {
    /// Boot partition contents
    pub boot: TempDir,
    /// Source files given with --config, --userdata and friends
    pub inputs: TempDir,
    /// Isolated settings and cache directory
    pub home: TempDir,
}

impl TestProject {
    /// Create a new test project in temporary directories
    pub fn new() -> Self {
        Self {
            boot: TempDir::new().expect("Failed to create temp directory"),
            inputs: TempDir::new().expect("Failed to create temp directory"),
            home: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path to the boot directory
    pub fn path(&self) -> PathBuf {
        self.boot.path().to_path_buf()
    }

    /// Create a file on the boot partition
    pub fn create_file(&self, name: &str, content: &str) {
        write(&self.boot.path().join(name), content);
    }

    /// Create an input file and return its path
    pub fn create_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inputs.path().join(name);
        write(&path, content);
        path
    }

    /// Write the settings file
    #[allow(dead_code)]
    pub fn write_settings(&self, content: &str) {
        write(&self.home.path().join("config").join("config.toml"), content);
    }

    /// Check if a file exists on the boot partition
    pub fn file_exists(&self, name: &str) -> bool {
        self.boot.path().join(name).exists()
    }

    /// Read a file from the boot partition
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.boot.path().join(name)).expect("Failed to read file")
    }

    /// Run the sdflash binary with isolated settings and cache directories
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_sdflash"))
            .args(args)
            .env("SDFLASH_CONFIG_DIR", self.home.path().join("config"))
            .env("SDFLASH_CACHE_DIR", self.home.path().join("cache"))
            .env_remove("SDFLASH_WIFI_PASSWORD")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute sdflash")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

/// cloud-init user-data with a hostname line
#[allow(dead_code)]
pub const GOOD_USER_DATA: &str = "\
#cloud-config
hostname: good
users:
  - name: other
    ssh-authorized-keys:
      - ssh-rsa AAAAB3NzaC1yc2E good@example
";

/// Legacy device-init.yaml as shipped on older images
#[allow(dead_code)]
pub const DEVICE_INIT: &str = "\
hostname: black-pearl
wifi:
  interfaces:
    wlan0:
      ssid: \"MyNetwork\"
      password: \"secret_password\"
clusterlab:
  service:
  run_on_boot: \"false\"
";

/// Legacy occidentalis.txt
#[allow(dead_code)]
pub const OCCIDENTALIS: &str = "\
# hostname for your Hypriot Raspberry Pi:
hostname=hypriot-pi

# basic wireless networking options:
wifi_ssid=your-ssid
wifi_password=your-presharedkey
";
