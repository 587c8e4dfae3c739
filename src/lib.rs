//! sdflash - flash and provision SD cards for single-board computers
//!
//! This library writes OS images to removable disks and provisions the boot
//! partition with hostname, WiFi and cloud-init settings.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Provisioning logic and collaborator traits
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
