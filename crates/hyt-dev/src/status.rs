//! States and status transitions reported by a watch session.

use std::fmt;

use camino::Utf8PathBuf;
use hyt_build::BuildOutcome;

/// Lifecycle of a watch session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been started.
    #[default]
    Idle,
    /// The watch is armed.
    Watching,
    /// The watch has been torn down.
    Stopped,
}

/// Where the session's build slot is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildState {
    /// No build is running.
    #[default]
    Idle,
    /// A build is running and nothing has changed since it started.
    Building,
    /// A build is running and another will start as soon as it finishes.
    BuildQueued,
}

impl BuildState {
    /// Returns `true` while a build process is running.
    #[must_use]
    pub const fn is_building(self) -> bool {
        matches!(self, Self::Building | Self::BuildQueued)
    }
}

/// A transition reported to the status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The watch is armed on `root`.
    Watching {
        /// Canonical project root.
        root: Utf8PathBuf,
    },
    /// A build started.
    Building {
        /// 1-based build counter within the session.
        build: u64,
        /// Changed files reported by the requests behind this build.
        changed_files: usize,
    },
    /// A build finished successfully.
    BuildSucceeded {
        /// Which build finished.
        build: u64,
        /// What the runner reported.
        outcome: BuildOutcome,
    },
    /// A build finished unsuccessfully. Watching continues.
    BuildFailed {
        /// Which build finished.
        build: u64,
        /// What the runner reported, including captured output.
        outcome: BuildOutcome,
    },
    /// Files changed during a build; one more build will follow it.
    RebuildQueued {
        /// Files in the request that caused the queueing.
        changed_files: usize,
    },
}

impl StatusEvent {
    /// Returns a short kebab-case name for the transition.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Watching { .. } => "watching",
            Self::Building { .. } => "building",
            Self::BuildSucceeded { .. } => "build-succeeded",
            Self::BuildFailed { .. } => "build-failed",
            Self::RebuildQueued { .. } => "rebuild-queued",
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watching { root } => write!(f, "watching {root}"),
            Self::Building {
                build,
                changed_files,
            } => write!(f, "build #{build} started ({changed_files} file(s) changed)"),
            Self::BuildSucceeded { build, outcome } => write!(
                f,
                "build #{build} succeeded in {:.1}s",
                outcome.duration.as_secs_f64()
            ),
            Self::BuildFailed { build, outcome } => {
                write!(f, "build #{build}: {}", outcome.summary())
            }
            Self::RebuildQueued { changed_files } => write!(
                f,
                "{changed_files} file(s) changed during the build, rebuilding when it finishes"
            ),
        }
    }
}
