//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, and external processes.
//! This module is the only place where side effects occur.

pub mod command;
pub mod dirs;
pub mod disk;
pub mod download;
pub mod filesystem;
pub mod image;
pub mod mount;
