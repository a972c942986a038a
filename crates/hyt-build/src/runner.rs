//! The build invocation seam.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use camino::Utf8Path;

use crate::error::BuildError;

/// Runs a full build of a project directory.
///
/// Implementations never return an error: anything that goes wrong (missing
/// tool, spawn failure, non-zero exit) is reported as a failed
/// [`BuildOutcome`], because the caller treats every kind of failure the
/// same way.
///
/// # Examples
///
/// ```
/// use hyt_build::{BuildOutcome, BuildRunner};
/// use camino::Utf8Path;
///
/// struct AlwaysGreen;
///
/// impl BuildRunner for AlwaysGreen {
///     async fn run(&self, _project_dir: &Utf8Path) -> BuildOutcome {
///         BuildOutcome::succeeded("BUILD SUCCESSFUL")
///     }
/// }
/// ```
pub trait BuildRunner: Send + Sync + 'static {
    /// Builds `project_dir` and waits for the result.
    fn run(&self, project_dir: &Utf8Path) -> impl Future<Output = BuildOutcome> + Send;
}

/// The result of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// `true` if the build tool exited successfully.
    pub success: bool,

    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,

    /// Captured output (stdout and stderr, in arrival order).
    ///
    /// Empty when the output went straight to the terminal.
    pub output: String,

    /// Wall-clock time the build took.
    pub duration: Duration,
}

impl BuildOutcome {
    /// A successful outcome with exit code 0.
    #[must_use]
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn failed(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            output: output.into(),
            duration: Duration::ZERO,
        }
    }

    /// A failed outcome for a build that never produced an exit status.
    #[must_use]
    pub fn from_error(err: &dyn fmt::Display) -> Self {
        Self::failed(None, err.to_string())
    }

    /// Sets the measured duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// One-line description for status output.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyt_build::BuildOutcome;
    ///
    /// assert_eq!(BuildOutcome::failed(Some(1), "").summary(), "build failed (exit code 1)");
    /// assert_eq!(BuildOutcome::succeeded("").summary(), "build succeeded");
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.success, self.exit_code) {
            (true, _) => "build succeeded".to_owned(),
            (false, Some(code)) => format!("build failed (exit code {code})"),
            (false, None) => "build failed".to_owned(),
        }
    }

    /// Returns the last `n` lines of captured output.
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self.output.lines().collect();
        let skip = lines.len().saturating_sub(n);
        lines.into_iter().skip(skip).collect()
    }

    /// Converts a failed outcome into [`BuildError::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Failed`] if the build did not succeed.
    pub fn into_result(self, task: &str) -> Result<Self, BuildError> {
        if self.success {
            Ok(self)
        } else {
            Err(BuildError::Failed {
                task: task.to_owned(),
                exit_code: self.exit_code,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_has_no_exit_code() {
        let err = BuildError::WrapperNotFound("/p/gradlew".into());
        let outcome = BuildOutcome::from_error(&err);
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.output.contains("/p/gradlew"));
        assert_eq!(outcome.summary(), "build failed");
    }

    #[test]
    fn test_tail() {
        let outcome = BuildOutcome::failed(Some(1), "a\nb\nc\nd\n");
        assert_eq!(outcome.tail(2), vec!["c", "d"]);
        assert_eq!(outcome.tail(10).len(), 4);
    }

    #[test]
    fn test_into_result() {
        assert!(BuildOutcome::succeeded("ok").into_result("build").is_ok());

        let err = BuildOutcome::failed(Some(2), "")
            .into_result("build")
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Failed {
                exit_code: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_with_duration() {
        let outcome = BuildOutcome::succeeded("").with_duration(Duration::from_secs(3));
        assert_eq!(outcome.duration, Duration::from_secs(3));
    }
}
