//! Error types for the hyt-dev crate.

use camino::Utf8PathBuf;
use hyt_core::ConfigError;
use hyt_watcher::WatchError;

/// Errors returned when a watch session cannot be started.
///
/// Everything that goes wrong after a session is running (failed builds,
/// transient filesystem races) is reported through the status callback
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum DevError {
    /// A session is already running for this coordinator.
    #[error("already watching {0}; stop the current session first")]
    AlreadyWatching(Utf8PathBuf),

    /// The watch could not be established.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// The watch options are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_error_is_transparent() {
        let err = DevError::from(WatchError::path_not_found("/missing/project"));
        assert!(err.to_string().contains("/missing/project"));
    }
}
