//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod devices;
pub mod doctor;
pub mod flash;
pub mod patch;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::core::request::ProvisioningInputs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an image to an SD card and provision its boot partition
    Flash {
        /// Image file or http(s) URL (.img, .img.gz, .img.xz or .zip)
        image: String,

        /// Device to write to, e.g. /dev/sdb (prompted for when omitted)
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Do not ask for confirmation before overwriting the device
        #[arg(short, long)]
        force: bool,

        /// Expected SHA-256 of the image as given
        #[arg(long, value_name = "HEX")]
        sha256: Option<String>,

        /// Boot partition filesystem type (probed when omitted)
        #[arg(long, value_name = "TYPE")]
        fs_type: Option<String>,

        #[command(flatten)]
        provision: ProvisionArgs,
    },

    /// Provision an already mounted or extracted boot partition
    Patch {
        /// Directory holding the boot partition contents
        dir: PathBuf,

        #[command(flatten)]
        provision: ProvisionArgs,
    },

    /// List disks that can be flashed
    Devices,

    /// Check that the external tools sdflash needs are installed
    Doctor,
}

/// Provisioning flags shared by `flash` and `patch`
#[derive(Args, Debug, Clone, Default)]
pub struct ProvisionArgs {
    /// Hostname to set
    #[arg(short = 'n', long)]
    pub hostname: Option<String>,

    /// WiFi SSID to set
    #[arg(short, long)]
    pub ssid: Option<String>,

    /// WiFi password to set
    #[arg(short, long, env = "SDFLASH_WIFI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Run the cluster-lab setup on first boot
    #[arg(short = 'c', long = "clusterlab", value_name = "BOOL")]
    pub cluster_lab: Option<bool>,

    /// Legacy device-init.yaml or occidentalis.txt to copy
    #[arg(short = 'C', long = "config", value_name = "FILE")]
    pub legacy_config: Option<PathBuf>,

    /// config.txt to copy onto the boot partition
    #[arg(short = 'F', long = "bootconf", value_name = "FILE")]
    pub boot_conf: Option<PathBuf>,

    /// cloud-init user-data to copy
    #[arg(short = 'u', long = "userdata", value_name = "FILE")]
    pub user_data: Option<PathBuf>,

    /// cloud-init meta-data to copy
    #[arg(short = 'm', long = "metadata", value_name = "FILE")]
    pub meta_data: Option<PathBuf>,
}

impl From<ProvisionArgs> for ProvisioningInputs {
    fn from(args: ProvisionArgs) -> Self {
        Self {
            legacy_config: args.legacy_config,
            boot_conf: args.boot_conf,
            user_data: args.user_data,
            meta_data: args.meta_data,
            hostname: args.hostname,
            wifi_ssid: args.ssid,
            wifi_password: args.password,
            cluster_lab: args.cluster_lab.map(|flag| flag.to_string()),
        }
    }
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Flash {
                image,
                device,
                force,
                sha256,
                fs_type,
                provision,
            } => {
                let options = flash::FlashArgs {
                    image,
                    device,
                    force,
                    sha256,
                    fs_type,
                };
                flash::execute(options, provision.into()).await
            }
            Self::Patch { dir, provision } => patch::execute(&dir, provision.into()),
            Self::Devices => devices::execute(),
            Self::Doctor => doctor::execute(),
        }
    }
}
