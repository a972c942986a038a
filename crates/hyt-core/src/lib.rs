//! Core configuration types, paths, and errors for the hyt tool.
//!
//! This crate provides the foundational pieces shared across the workspace:
//!
//! - [`WatchConfig`] - options for the edit-rebuild loop (quiet period, ignores)
//! - [`HytConfig`] - the persisted user configuration (`~/.hyt/config.json`)
//! - [`paths`] - helpers for resolving config, runtime and project paths
//! - [`ConfigError`] - errors raised while loading or saving configuration

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod paths;

pub use config::{HytConfig, WatchConfig};
pub use error::ConfigError;
