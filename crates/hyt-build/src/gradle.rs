//! Running the project's Gradle wrapper.

use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::BuildError;
use crate::runner::{BuildOutcome, BuildRunner};

/// Arguments for a regular incremental Gradle build.
const BUILD_ARGS: &[&str] = &["build"];

/// Arguments for a forced full rebuild.
const FORCE_BUILD_ARGS: &[&str] = &["clean", "build", "--rerun-tasks"];

/// Where build output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream straight to this process's terminal.
    #[default]
    Inherit,
    /// Collect into [`BuildOutcome::output`], logging each line at `debug`.
    Capture,
}

/// Returns the wrapper script for `project_dir` on this platform.
///
/// # Examples
///
/// ```
/// use hyt_build::wrapper_path;
/// use camino::Utf8Path;
///
/// let wrapper = wrapper_path(Utf8Path::new("/work/plugin"));
/// assert!(wrapper.as_str().starts_with("/work/plugin/gradlew"));
/// ```
#[must_use]
pub fn wrapper_path(project_dir: &Utf8Path) -> Utf8PathBuf {
    if cfg!(windows) {
        project_dir.join("gradlew.bat")
    } else {
        project_dir.join("gradlew")
    }
}

/// Returns `true` if `project_dir` contains a Gradle wrapper script.
#[must_use]
pub fn has_gradle_wrapper(project_dir: &Utf8Path) -> bool {
    wrapper_path(project_dir).is_file()
}

/// Builds projects through their Gradle wrapper.
///
/// # Examples
///
/// ```
/// use hyt_build::{GradleRunner, OutputMode};
///
/// let runner = GradleRunner::new()
///     .with_java_home("/opt/jdk-25")
///     .with_output(OutputMode::Capture)
///     .force_rebuild(true);
/// assert_eq!(runner.build_args(), ["clean", "build", "--rerun-tasks"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GradleRunner {
    java_home: Option<Utf8PathBuf>,
    output: OutputMode,
    force: bool,
}

impl GradleRunner {
    /// Creates a runner that runs `build` with inherited output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports `JAVA_HOME` to the build.
    #[must_use]
    pub fn with_java_home(mut self, java_home: impl Into<Utf8PathBuf>) -> Self {
        self.java_home = Some(java_home.into());
        self
    }

    /// Chooses where build output goes.
    #[must_use]
    pub const fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Runs `clean build --rerun-tasks` instead of `build`.
    #[must_use]
    pub const fn force_rebuild(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Returns the arguments a full build passes to the wrapper.
    #[must_use]
    pub const fn build_args(&self) -> &'static [&'static str] {
        if self.force { FORCE_BUILD_ARGS } else { BUILD_ARGS }
    }

    /// Runs an arbitrary Gradle task.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::WrapperNotFound`] or [`BuildError::Spawn`] if the
    /// wrapper cannot be started. A task that runs and fails is reported in
    /// the returned outcome; use [`BuildOutcome::into_result`] to turn that
    /// into an error.
    pub async fn run_task(
        &self,
        project_dir: &Utf8Path,
        task: &str,
    ) -> Result<BuildOutcome, BuildError> {
        self.invoke(project_dir, &[task]).await
    }

    async fn invoke(
        &self,
        project_dir: &Utf8Path,
        args: &[&str],
    ) -> Result<BuildOutcome, BuildError> {
        let wrapper = wrapper_path(project_dir);
        if !wrapper.is_file() {
            return Err(BuildError::WrapperNotFound(wrapper));
        }

        let mut cmd = Command::new(wrapper.as_std_path());
        cmd.args(args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .kill_on_drop(false);
        if let Some(home) = &self.java_home {
            cmd.env("JAVA_HOME", home.as_std_path());
        }

        info!(project = %project_dir, args = ?args, "Running Gradle");
        let started = Instant::now();

        let (status, output) = match self.output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
                let status = cmd
                    .status()
                    .await
                    .map_err(|e| BuildError::spawn(&wrapper, e))?;
                (status, String::new())
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                let mut child = cmd.spawn().map_err(|e| BuildError::spawn(&wrapper, e))?;

                let (tx, mut rx) = mpsc::unbounded_channel();
                if let Some(stdout) = child.stdout.take() {
                    tokio::spawn(forward_lines(stdout, tx.clone()));
                }
                if let Some(stderr) = child.stderr.take() {
                    tokio::spawn(forward_lines(stderr, tx.clone()));
                }
                drop(tx);

                let mut output = String::new();
                while let Some(line) = rx.recv().await {
                    debug!(target: "gradle", "{line}");
                    output.push_str(&line);
                    output.push('\n');
                }

                (child.wait().await?, output)
            }
        };

        let outcome = outcome_from(status, output).with_duration(started.elapsed());
        info!(
            project = %project_dir,
            success = outcome.success,
            exit_code = ?outcome.exit_code,
            elapsed_ms = u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
            "Gradle finished"
        );
        Ok(outcome)
    }
}

impl BuildRunner for GradleRunner {
    async fn run(&self, project_dir: &Utf8Path) -> BuildOutcome {
        match self.invoke(project_dir, self.build_args()).await {
            Ok(outcome) => outcome,
            Err(err) => BuildOutcome::from_error(&err),
        }
    }
}

fn outcome_from(status: ExitStatus, output: String) -> BuildOutcome {
    if status.success() {
        BuildOutcome::succeeded(output)
    } else {
        BuildOutcome::failed(status.code(), output)
    }
}

/// Reads `reader` line by line until EOF, tolerating non-UTF-8 output.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if tx.send(line.trim_end_matches(['\r', '\n']).to_owned()).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, path)
    }

    #[cfg(unix)]
    fn write_wrapper(project_dir: &Utf8Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = wrapper_path(project_dir);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_build_args() {
        assert_eq!(GradleRunner::new().build_args(), ["build"]);
        assert_eq!(
            GradleRunner::new().force_rebuild(true).build_args(),
            ["clean", "build", "--rerun-tasks"]
        );
    }

    #[test]
    fn test_has_gradle_wrapper() {
        let (_dir, root) = project();
        assert!(!has_gradle_wrapper(&root));
        std::fs::write(wrapper_path(&root), "").unwrap();
        assert!(has_gradle_wrapper(&root));
    }

    #[tokio::test]
    async fn test_missing_wrapper_is_a_failed_outcome() {
        let (_dir, root) = project();
        let outcome = GradleRunner::new().run(&root).await;

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.output.contains("Gradle wrapper not found"));
    }

    #[tokio::test]
    async fn test_run_task_missing_wrapper_is_an_error() {
        let (_dir, root) = project();
        let result = GradleRunner::new().run_task(&root, "jar").await;
        assert!(matches!(result, Err(BuildError::WrapperNotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_success() {
        let (_dir, root) = project();
        write_wrapper(&root, "echo \"args: $*\"\necho 'BUILD SUCCESSFUL'");

        let outcome = GradleRunner::new()
            .with_output(OutputMode::Capture)
            .run(&root)
            .await;

        assert!(outcome.success, "output: {}", outcome.output);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.output.contains("args: build"));
        assert_eq!(outcome.tail(1), vec!["BUILD SUCCESSFUL"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_failure_keeps_stderr() {
        let (_dir, root) = project();
        write_wrapper(&root, "echo 'compiling'\necho 'error: cannot find symbol' >&2\nexit 3");

        let outcome = GradleRunner::new()
            .with_output(OutputMode::Capture)
            .run(&root)
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert!(outcome.output.contains("compiling"));
        assert!(outcome.output.contains("cannot find symbol"));
        assert_eq!(outcome.summary(), "build failed (exit code 3)");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_force_rebuild_and_java_home() {
        let (_dir, root) = project();
        write_wrapper(&root, "echo \"args: $*\"\necho \"java: $JAVA_HOME\"");

        let outcome = GradleRunner::new()
            .with_output(OutputMode::Capture)
            .with_java_home("/opt/jdk-25")
            .force_rebuild(true)
            .run(&root)
            .await;

        assert!(outcome.success);
        assert!(outcome.output.contains("args: clean build --rerun-tasks"));
        assert!(outcome.output.contains("java: /opt/jdk-25"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_task() {
        let (_dir, root) = project();
        write_wrapper(&root, "echo \"task: $1\"\nexit 1");

        let outcome = GradleRunner::new()
            .with_output(OutputMode::Capture)
            .run_task(&root, "runServer")
            .await
            .expect("wrapper should start");

        assert!(outcome.output.contains("task: runServer"));
        let err = outcome.into_result("runServer").unwrap_err();
        assert!(err.to_string().contains("Gradle runServer failed with exit code 1"));
    }
}
