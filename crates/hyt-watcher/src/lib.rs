//! Change detection for the edit-rebuild loop.
//!
//! This crate turns filesystem activity in a plugin project into a paced
//! sequence of rebuild requests:
//!
//! 1. [`ChangeSource`] wraps `notify` (via `notify-debouncer-mini`) and only
//!    reports a file once it has stopped being written to.
//! 2. [`IgnoreFilter`] drops build output, caches, VCS metadata and compiled
//!    artifacts before they reach the channel.
//! 3. [`DebounceWindow`] folds bursts of [`ChangeEvent`]s into a single
//!    [`RebuildRequest`] once the project has been quiet for a while.
//!
//! # Crate Dependencies
//!
//! ```text
//! hyt-cli ──► hyt-dev ──► hyt-watcher ──► hyt-core
//!    │                └─► hyt-build
//!    ├──► hyt-env ──────────────────────► hyt-core
//!    └──► hyt-scaffold
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use hyt_watcher::{ChangeSource, DebounceWindow, IgnoreFilter};
//! use hyt_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), hyt_watcher::WatchError> {
//! let root = Utf8Path::new("./my-plugin");
//! let config = WatchConfig::default();
//! let filter = IgnoreFilter::new(root, &config.ignore_patterns)?;
//!
//! let (mut source, mut events) = ChangeSource::start(root, &config, filter)?;
//! let mut window = DebounceWindow::new(config.quiet_period());
//!
//! while let Some(request) = window.next_request(&mut events).await {
//!     println!("{} file(s) changed, rebuilding", request.changed_files);
//! }
//!
//! source.stop();
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Only setup problems (missing root, bad ignore glob, OS watch failure)
//! surface as [`WatchError`] from [`ChangeSource::start`]. Problems with
//! individual events are logged and the stream keeps flowing.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod debounce;
pub mod error;
pub mod events;
pub mod filter;
pub mod source;

pub use debounce::DebounceWindow;
pub use error::WatchError;
pub use events::{ChangeEvent, ChangeKind, PendingChanges, RebuildRequest};
pub use filter::{AcceptAllFilter, DEFAULT_IGNORE_PATTERNS, FileFilter, IgnoreFilter};
pub use source::{ChangeSender, ChangeSource, ChangeStream};
