//! Error types for the hyt-env crate.

use camino::Utf8PathBuf;
use hyt_core::ConfigError;

/// Errors raised while locating the Java runtime or the game installation.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// No usable Java runtime was found anywhere.
    #[error(
        "Java {required} or higher was not found. Install it, set `javaPath` in ~/.hyt/config.json, or pass --java"
    )]
    JavaNotFound {
        /// The minimum major version.
        required: u32,
    },

    /// A Java runtime was found but is too old.
    #[error("Java {required} or higher is required. Found version {found} at {path}")]
    JavaUnsupported {
        /// The executable that was probed.
        path: Utf8PathBuf,
        /// The major version it reported.
        found: u32,
        /// The minimum major version.
        required: u32,
    },

    /// The path does not point at an executable file.
    #[error("not an executable Java binary: {0}")]
    JavaNotExecutable(Utf8PathBuf),

    /// `java -version` ran but its output had no recognisable version.
    #[error("could not parse the Java version reported by {0}")]
    VersionUnparsable(Utf8PathBuf),

    /// `java -version` could not be run.
    #[error("failed to run {path} -version: {source}")]
    Probe {
        /// The executable that was probed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No game installation was found in the usual places.
    #[error("Hytale installation not found. Pass --hytale-dir or set `hytaleInstallPath` in ~/.hyt/config.json")]
    InstallNotFound,

    /// A user-supplied installation path is not a game installation.
    #[error("invalid Hytale installation at {path}: {reason}")]
    InvalidInstall {
        /// The path that was checked.
        path: Utf8PathBuf,
        /// What was missing.
        reason: String,
    },

    /// No JDK build is published for this operating system and architecture.
    #[error("no Java {required} download is available for {os}/{arch}")]
    UnsupportedPlatform {
        /// Operating system, as in `std::env::consts::OS`.
        os: String,
        /// Architecture, as in `std::env::consts::ARCH`.
        arch: String,
        /// The major version that was requested.
        required: u32,
    },

    /// Downloading the JDK archive failed.
    #[error("failed to download {url}: {source}")]
    Download {
        /// The URL that was requested.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The downloaded archive could not be unpacked.
    #[error("failed to extract {path}: {reason}")]
    Extract {
        /// The archive.
        path: Utf8PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// An installation finished without producing a `java` executable.
    #[error("Java was installed to {0} but no java executable was found there")]
    InstallIncomplete(Utf8PathBuf),

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being read or written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration problem, such as an unavailable home directory.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EnvError {
    /// Creates a new [`EnvError::InvalidInstall`] error.
    #[inline]
    pub fn invalid_install(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidInstall {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`EnvError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`EnvError::Extract`] error.
    #[inline]
    pub fn extract(path: impl Into<Utf8PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Extract {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if installing a managed runtime would resolve this
    /// Java lookup failure.
    #[must_use]
    pub const fn is_installable(&self) -> bool {
        matches!(
            self,
            Self::JavaNotFound { .. } | Self::JavaUnsupported { .. }
        )
    }

    /// Returns `true` if nothing was found, as opposed to something broken
    /// being found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::JavaNotFound { .. } | Self::InstallNotFound)
    }
}
