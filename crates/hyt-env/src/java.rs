//! Java runtime discovery and validation.
//!
//! Candidates are tried in this order:
//!
//! 1. the path configured by the user (`--java` or `javaPath`)
//! 2. the managed runtime under `~/.hyt/java25`
//! 3. `java` on `PATH`
//!
//! Each candidate is probed with `java -version` and must report at least
//! [`REQUIRED_JAVA_VERSION`]. When none qualifies and the locator carries a
//! [`JavaInstaller`], a runtime is downloaded into the managed directory.

use std::fmt;
use std::future::Future;
use std::process::Stdio;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::EnvError;
use crate::install::JavaInstaller;

/// Minimum Java major version for plugin builds.
pub const REQUIRED_JAVA_VERSION: u32 = 25;

pub(crate) const JAVA_BIN: &str = if cfg!(windows) { "java.exe" } else { "java" };

/// Where a Java candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaSource {
    /// Supplied by the user.
    Configured,
    /// The runtime hyt manages under `~/.hyt`.
    Managed,
    /// Found on `PATH`.
    SystemPath,
}

impl fmt::Display for JavaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configured => "configured",
            Self::Managed => "managed",
            Self::SystemPath => "PATH",
        })
    }
}

/// A validated Java runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntime {
    /// Path to the `java` executable.
    pub executable: Utf8PathBuf,
    /// Major version reported by `java -version`.
    pub version: u32,
    /// Where it was found.
    pub source: JavaSource,
}

impl JavaRuntime {
    /// Returns the runtime's home directory (the parent of `bin/`), suitable
    /// for `JAVA_HOME`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hyt_env::{JavaRuntime, JavaSource};
    ///
    /// let java = JavaRuntime {
    ///     executable: "/opt/jdk-25/bin/java".into(),
    ///     version: 25,
    ///     source: JavaSource::Configured,
    /// };
    /// assert_eq!(java.home().map(|p| p.as_str()), Some("/opt/jdk-25"));
    /// ```
    #[must_use]
    pub fn home(&self) -> Option<&Utf8Path> {
        let bin = self.executable.parent()?;
        if bin.file_name() == Some("bin") {
            bin.parent()
        } else {
            None
        }
    }
}

/// Finds a usable Java runtime.
///
/// Probing a candidate runs it, so locating is async.
pub trait JavaLocator: Send + Sync {
    /// Returns the first runtime that satisfies [`REQUIRED_JAVA_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::JavaNotFound`] if there are no candidates, or the
    /// error of the most informative rejected candidate.
    fn locate(&self) -> impl Future<Output = Result<JavaRuntime, EnvError>> + Send;
}

/// Looks for Java in the configured path, the managed install and `PATH`.
///
/// # Examples
///
/// ```no_run
/// use hyt_env::{JavaLocator, SystemJavaLocator};
///
/// # async fn example() -> Result<(), hyt_env::EnvError> {
/// let java = SystemJavaLocator::new().locate().await?;
/// println!("Java {} at {}", java.version, java.executable);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SystemJavaLocator {
    configured: Option<Utf8PathBuf>,
    managed_dir: Option<Utf8PathBuf>,
    search_path: bool,
    installer: Option<JavaInstaller>,
}

impl Default for SystemJavaLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemJavaLocator {
    /// Creates a locator with the default managed directory and `PATH`
    /// lookup enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            configured: None,
            managed_dir: hyt_core::paths::java_install_dir().ok(),
            search_path: true,
            installer: None,
        }
    }

    /// Uses `path` as the user's explicit choice.
    ///
    /// A configured path is authoritative: if it fails validation the
    /// locator reports that failure instead of falling back.
    #[must_use]
    pub fn with_configured(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.configured = path;
        self
    }

    /// Overrides the managed runtime directory.
    #[must_use]
    pub fn with_managed_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.managed_dir = Some(dir.into());
        self
    }

    /// Disables the `PATH` lookup.
    #[must_use]
    pub const fn without_path_lookup(mut self) -> Self {
        self.search_path = false;
        self
    }

    /// Installs a managed runtime with `installer` when no candidate
    /// qualifies. Never used for a configured path.
    #[must_use]
    pub fn with_installer(mut self, installer: JavaInstaller) -> Self {
        self.installer = Some(installer);
        self
    }

    fn candidates(&self) -> Vec<(JavaSource, Utf8PathBuf)> {
        let mut out = Vec::new();
        if let Some(dir) = &self.managed_dir {
            out.extend(
                managed_java_candidates(dir)
                    .into_iter()
                    .map(|p| (JavaSource::Managed, p)),
            );
        }
        if self.search_path {
            if let Some(path) = which::which("java")
                .ok()
                .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            {
                out.push((JavaSource::SystemPath, path));
            }
        }
        out
    }
}

impl JavaLocator for SystemJavaLocator {
    async fn locate(&self) -> Result<JavaRuntime, EnvError> {
        if let Some(path) = &self.configured {
            return validate(path, JavaSource::Configured).await;
        }

        let mut rejected = None;
        for (source, path) in self.candidates() {
            match validate(&path, source).await {
                Ok(runtime) => return Ok(runtime),
                Err(err) => {
                    debug!(path = %path, %source, error = %err, "Rejected Java candidate");
                    // A version mismatch says more than a missing file.
                    let upgrade = matches!(err, EnvError::JavaUnsupported { .. })
                        && !matches!(rejected, Some(EnvError::JavaUnsupported { .. }));
                    if rejected.is_none() || upgrade {
                        rejected = Some(err);
                    }
                }
            }
        }

        if let Some(installer) = &self.installer {
            if let Some(err) = &rejected {
                info!(error = %err, "No usable Java runtime, installing one");
            }
            return installer.install().await;
        }

        Err(rejected.unwrap_or(EnvError::JavaNotFound {
            required: REQUIRED_JAVA_VERSION,
        }))
    }
}

/// Returns the `java` executables that may exist under a managed install
/// directory, in preference order. Only existing files are returned.
#[must_use]
pub fn managed_java_candidates(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut roots = vec![dir.to_owned()];
    if let Ok(entries) = dir.read_dir_utf8() {
        let mut jdks: Vec<Utf8PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_name().starts_with("jdk-") && e.path().is_dir())
            .map(|e| e.path().to_owned())
            .collect();
        jdks.sort();
        roots.extend(jdks);
    }

    roots
        .iter()
        .flat_map(|root| {
            [
                root.join("bin").join(JAVA_BIN),
                root.join("Contents").join("Home").join("bin").join(JAVA_BIN),
            ]
        })
        .filter(|p| p.is_file())
        .collect()
}

/// Returns `true` if `path` is a file that can be executed.
#[must_use]
pub fn verify_java_path(path: &Utf8Path) -> bool {
    let Ok(meta) = path.metadata() else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Extracts the major version from `java -version` output.
///
/// Legacy `1.x` version strings report `x`.
///
/// # Examples
///
/// ```
/// use hyt_env::java::parse_java_version;
///
/// assert_eq!(parse_java_version(r#"openjdk version "25" 2025-09-16"#), Some(25));
/// assert_eq!(parse_java_version(r#"java version "1.8.0_392""#), Some(8));
/// assert_eq!(parse_java_version("command not found"), None);
/// ```
#[must_use]
pub fn parse_java_version(output: &str) -> Option<u32> {
    let re = Regex::new(r#"version "(\d+)(?:\.(\d+))?"#).ok()?;
    let caps = re.captures(output)?;
    let major: u32 = caps.get(1)?.as_str().parse().ok()?;
    if major == 1 {
        caps.get(2).and_then(|m| m.as_str().parse().ok())
    } else {
        Some(major)
    }
}

/// Runs `java -version` and returns the major version.
///
/// # Errors
///
/// Returns [`EnvError::Probe`] if the binary cannot be run, or
/// [`EnvError::VersionUnparsable`] if its output has no version.
pub async fn probe_java_version(path: &Utf8Path) -> Result<u32, EnvError> {
    let output = Command::new(path.as_std_path())
        .arg("-version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| EnvError::Probe {
            path: path.to_owned(),
            source,
        })?;

    // The version banner goes to stderr; some wrappers print it on stdout.
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_java_version(&stderr)
        .or_else(|| parse_java_version(&stdout))
        .ok_or_else(|| EnvError::VersionUnparsable(path.to_owned()))
}

pub(crate) async fn validate(
    path: &Utf8Path,
    source: JavaSource,
) -> Result<JavaRuntime, EnvError> {
    if !verify_java_path(path) {
        return Err(EnvError::JavaNotExecutable(path.to_owned()));
    }
    let version = probe_java_version(path).await?;
    if version < REQUIRED_JAVA_VERSION {
        return Err(EnvError::JavaUnsupported {
            path: path.to_owned(),
            found: version,
            required: REQUIRED_JAVA_VERSION,
        });
    }
    info!(path = %path, version, %source, "Using Java runtime");
    Ok(JavaRuntime {
        executable: path.to_owned(),
        version,
        source,
    })
}
