//! Error types for the hyt-build crate.

use camino::Utf8PathBuf;

/// Errors that can occur when invoking the build tool.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The project has no Gradle wrapper script.
    #[error("Gradle wrapper not found at {0}; run `gradle wrapper` in the project first")]
    WrapperNotFound(Utf8PathBuf),

    /// The build process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// The program that failed to start.
        program: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The build ran and reported failure.
    #[error("Gradle {task} failed with exit code {}. Check the output above for details.", describe_exit_code(.exit_code))]
    Failed {
        /// The task or tasks that were run.
        task: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
    },

    /// Waiting on the build process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn describe_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_owned(), |c| c.to_string())
}

impl BuildError {
    /// Creates a new [`BuildError::Spawn`] error.
    #[inline]
    pub fn spawn(program: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }
}
