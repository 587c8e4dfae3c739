//! Core business logic module
//!
//! This module contains the provisioning logic for sdflash. Tools and
//! processes are reached through the traits in [`device`] and implemented
//! in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`request`] - Provisioning inputs and their validation
//! - [`line_format`] - Line classifiers for the boot partition config files
//! - [`patcher`] - Applies a provisioning request to a boot directory
//! - [`device`] - Block devices, selection and the imaging/mount traits
//! - [`image`] - Source image classification
//! - [`flash`] - Flash orchestration
//! - [`settings`] - Settings file
//! - [`doctor`] - System tool checks

pub mod device;
pub mod doctor;
pub mod flash;
pub mod image;
pub mod line_format;
pub mod patcher;
pub mod request;
pub mod settings;
