//! Error types for the hyt-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while arming a watch or processing its events.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the watch could not be armed
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - root must exist
/// - **Not a directory** ([`WatchError::NotADirectory`]): Fatal - root must be a directory
/// - **Invalid pattern** ([`WatchError::InvalidPattern`]): Fatal - ignore rules are part of setup
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **Stat failure** ([`WatchError::Stat`]): Recoverable - the file raced the event
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use hyt_watcher::WatchError;
///
/// fn handle_watch_error(err: &WatchError) {
///     if err.is_fatal() {
///         eprintln!("cannot watch: {err}");
///     } else {
///         eprintln!("warning: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified root path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The specified root path is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// An ignore pattern could not be compiled.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: ignore::Error,
    },

    /// A path is not valid UTF-8.
    ///
    /// Such paths are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A changed path could not be inspected.
    ///
    /// Typically the file was replaced or its permissions changed between
    /// the notification and the stat.
    #[error("failed to inspect {path}: {source}")]
    Stat {
        /// The path that could not be inspected.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Creates a new [`WatchError::Stat`] error.
    #[inline]
    pub fn stat(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    ///
    /// Recoverable errors concern a single event and never stop the watch.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_) | Self::Stat { .. })
    }

    /// Returns `true` if this error is fatal (watching cannot start or continue).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::NotADirectory(path) | Self::Stat { path, .. } => {
                Some(path)
            }
            Self::Notify(_) | Self::InvalidPattern { .. } | Self::NonUtf8Path(_) | Self::Io(_) => {
                None
            }
        }
    }
}
