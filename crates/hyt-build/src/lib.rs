//! Build invocation for hyt projects.
//!
//! The rebuild coordinator only needs one thing from a build tool: run a
//! full build of a project directory and say whether it worked. That seam is
//! the [`BuildRunner`] trait; [`GradleRunner`] implements it by calling the
//! project's Gradle wrapper.
//!
//! # Examples
//!
//! ```no_run
//! use hyt_build::{BuildRunner, GradleRunner, OutputMode};
//! use camino::Utf8Path;
//!
//! # async fn example() {
//! let runner = GradleRunner::new().with_output(OutputMode::Capture);
//! let outcome = runner.run(Utf8Path::new("./my-plugin")).await;
//! if !outcome.success {
//!     eprintln!("{}", outcome.summary());
//! }
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod gradle;
pub mod runner;

pub use error::BuildError;
pub use gradle::{GradleRunner, OutputMode, has_gradle_wrapper, wrapper_path};
pub use runner::{BuildOutcome, BuildRunner};
