//! CLI command implementations.
//!
//! - [`config`] - Configuration management (init, show, path)
//! - [`install`] - Install a verified client binary
//! - [`run`] - Run a node and accept console commands
//! - [`update`] - Check for a newer client release

pub mod common;
pub mod config;
pub mod install;
pub mod run;
pub mod update;
