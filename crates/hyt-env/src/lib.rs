//! Toolchain and game discovery for hyt.
//!
//! Both lookups run once, before a dev session starts:
//!
//! - [`JavaLocator`] finds a Java runtime new enough to build plugins
//!   ([`REQUIRED_JAVA_VERSION`]).
//! - [`GameInstallLocator`] finds the Hytale installation whose server and
//!   assets plugins are built against.
//!
//! When no runtime qualifies, [`JavaInstaller`] can download one into the
//! managed directory. It only runs when the caller opts in, either directly
//! or through [`SystemJavaLocator::with_installer`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod game;
pub mod install;
pub mod java;

pub use error::EnvError;
pub use game::{GameInstall, GameInstallLocator, SearchPathLocator, verify_install};
pub use install::{ArchiveFormat, JavaInstaller};
pub use java::{
    JavaLocator, JavaRuntime, JavaSource, REQUIRED_JAVA_VERSION, SystemJavaLocator,
    verify_java_path,
};
