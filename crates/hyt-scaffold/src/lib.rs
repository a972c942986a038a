//! Project scaffolding for `hyt init`.
//!
//! A new plugin project is a copy of a template directory with the plugin
//! name substituted for placeholders. See [`template`] for the placeholder
//! table.
//!
//! ```no_run
//! use camino::Utf8Path;
//! use hyt_scaffold::{PluginName, scaffold};
//!
//! let name = PluginName::parse("better-mobs")?;
//! let report = scaffold(
//!     Utf8Path::new("templates/plugin"),
//!     Utf8Path::new("better-mobs"),
//!     &name,
//! )?;
//! println!("created {} files", report.files.len());
//! # Ok::<(), hyt_scaffold::ScaffoldError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod name;
pub mod template;

pub use error::ScaffoldError;
pub use name::{PluginName, to_pascal_case};
pub use template::{
    CLASS_PLACEHOLDER, NAME_PLACEHOLDER, PACKAGE_PLACEHOLDER, ScaffoldReport, render, scaffold,
};
