//! Managed JDK installation.
//!
//! [`JavaInstaller`] downloads an Eclipse Temurin build of Java
//! [`REQUIRED_JAVA_VERSION`] from the Adoptium API and unpacks it into the
//! managed directory, where [`SystemJavaLocator`](crate::SystemJavaLocator)
//! looks first on later runs:
//!
//! ```text
//! GET {ADOPTIUM_API}/25/ga/{os}/{arch}/jdk/hotspot/normal/eclipse
//!   └─► ~/.hyt/java25/java25.tar.gz          (java25.zip on Windows)
//!         └─► ~/.hyt/java25/.extract/jdk-25…/
//!               └─► ~/.hyt/java25/{bin,lib,…}  (top-level folder stripped)
//! ```

use std::fs;
use std::io::BufReader;
use std::process::Stdio;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use ignore::WalkBuilder;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::EnvError;
use crate::java::{
    JAVA_BIN, JavaRuntime, JavaSource, REQUIRED_JAVA_VERSION, managed_java_candidates, validate,
    verify_java_path,
};

/// Base URL of the Adoptium binary API.
pub const ADOPTIUM_API: &str = "https://api.adoptium.net/v3/binary/latest";

/// Scratch directory inside the install directory used while unpacking.
const STAGING_DIR: &str = ".extract";

/// Container format of a JDK download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Gzipped tarball, published for Linux and macOS.
    TarGz,
    /// Zip archive, published for Windows.
    Zip,
}

impl ArchiveFormat {
    /// Returns the format Adoptium publishes for `os`.
    #[must_use]
    pub fn for_os(os: &str) -> Self {
        if os == "windows" { Self::Zip } else { Self::TarGz }
    }

    /// Returns the file extension, without a leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

/// Returns the Adoptium download URL for a platform.
///
/// `os` and `arch` use the names of [`std::env::consts`].
///
/// # Examples
///
/// ```
/// use hyt_env::install::download_url;
///
/// let url = download_url("macos", "aarch64")?;
/// assert!(url.ends_with("/25/ga/mac/aarch64/jdk/hotspot/normal/eclipse"));
/// assert!(download_url("windows", "aarch64").is_err());
/// # Ok::<(), hyt_env::EnvError>(())
/// ```
pub fn download_url(os: &str, arch: &str) -> Result<String, EnvError> {
    let unsupported = || EnvError::UnsupportedPlatform {
        os: os.to_owned(),
        arch: arch.to_owned(),
        required: REQUIRED_JAVA_VERSION,
    };

    let os_name = match os {
        "linux" => "linux",
        "macos" => "mac",
        "windows" => "windows",
        _ => return Err(unsupported()),
    };
    let arch_name = match (os, arch) {
        (_, "x86_64") => "x64",
        ("linux" | "macos", "aarch64") => "aarch64",
        _ => return Err(unsupported()),
    };

    Ok(format!(
        "{ADOPTIUM_API}/{REQUIRED_JAVA_VERSION}/ga/{os_name}/{arch_name}/jdk/hotspot/normal/eclipse"
    ))
}

/// Downloads and unpacks a JDK into a managed directory.
///
/// # Examples
///
/// ```no_run
/// use hyt_env::JavaInstaller;
///
/// # async fn example() -> Result<(), hyt_env::EnvError> {
/// let java = JavaInstaller::new()?.install().await?;
/// println!("installed Java {} at {}", java.version, java.executable);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JavaInstaller {
    install_dir: Utf8PathBuf,
    url: String,
    format: ArchiveFormat,
    client: reqwest::Client,
}

impl JavaInstaller {
    /// Creates an installer for the running platform that installs into
    /// `~/.hyt/java25`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::UnsupportedPlatform`] if no JDK is published for
    /// this platform, or [`EnvError::Config`] if the home directory is
    /// unavailable.
    pub fn new() -> Result<Self, EnvError> {
        Self::for_platform(
            hyt_core::paths::java_install_dir()?,
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }

    /// Creates an installer for an explicit platform and directory.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::UnsupportedPlatform`] if no JDK is published for
    /// `os`/`arch`.
    pub fn for_platform(
        install_dir: impl Into<Utf8PathBuf>,
        os: &str,
        arch: &str,
    ) -> Result<Self, EnvError> {
        let url = download_url(os, arch)?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("hyt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| EnvError::Download {
                url: url.clone(),
                source,
            })?;

        Ok(Self {
            install_dir: install_dir.into(),
            url,
            format: ArchiveFormat::for_os(os),
            client,
        })
    }

    /// Downloads from `url` instead of Adoptium.
    #[must_use]
    pub fn with_source(mut self, url: impl Into<String>, format: ArchiveFormat) -> Self {
        self.url = url.into();
        self.format = format;
        self
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the directory the runtime is installed into.
    #[must_use]
    pub fn install_dir(&self) -> &Utf8Path {
        &self.install_dir
    }

    /// Returns the download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Downloads, unpacks and validates the runtime.
    ///
    /// Files from an earlier installation that the new archive also
    /// contains are replaced. The downloaded archive is deleted afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::Download`] for HTTP failures,
    /// [`EnvError::Extract`] or [`EnvError::Io`] if unpacking fails, and
    /// [`EnvError::InstallIncomplete`] if the archive held no `java`. The
    /// installed runtime is validated like any other candidate.
    pub async fn install(&self) -> Result<JavaRuntime, EnvError> {
        let dir = self.install_dir.clone();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| EnvError::io(&dir, e))?;

        let archive = dir.join(format!(
            "java{REQUIRED_JAVA_VERSION}.{}",
            self.format.extension()
        ));
        info!(url = %self.url, dest = %dir, "Downloading Java {REQUIRED_JAVA_VERSION}");
        let bytes = self.download(&archive).await?;
        info!(bytes, archive = %archive, "Download finished, extracting");

        let staging = dir.join(STAGING_DIR);
        match tokio::fs::remove_dir_all(&staging).await {
            Ok(()) => debug!(path = %staging, "Removed stale staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(EnvError::io(&staging, e)),
        }

        if self.format == ArchiveFormat::Zip {
            expand_zip(&archive, &staging).await?;
        }

        let format = self.format;
        let task = {
            let (archive, staging, dir) = (archive.clone(), staging.clone(), dir.clone());
            tokio::task::spawn_blocking(move || {
                if format == ArchiveFormat::TarGz {
                    unpack_tar_gz(&archive, &staging)?;
                }
                promote(&staging, &dir)?;
                fs::remove_file(&archive).map_err(|e| EnvError::io(&archive, e))?;
                Ok::<_, EnvError>(find_java(&dir))
            })
        };
        let java = task
            .await
            .map_err(|e| EnvError::extract(&archive, e))??
            .ok_or_else(|| EnvError::InstallIncomplete(dir.clone()))?;

        info!(path = %java, "Java unpacked");
        validate(&java, JavaSource::Managed).await
    }

    async fn download(&self, dest: &Utf8Path) -> Result<usize, EnvError> {
        let failed = |source: reqwest::Error| EnvError::Download {
            url: self.url.clone(),
            source,
        };

        let mut response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(failed)?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| EnvError::io(dest, e))?;
        let mut written = 0;
        while let Some(chunk) = response.chunk().await.map_err(failed)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| EnvError::io(dest, e))?;
            written += chunk.len();
        }
        file.flush().await.map_err(|e| EnvError::io(dest, e))?;
        Ok(written)
    }
}

fn unpack_tar_gz(archive: &Utf8Path, staging: &Utf8Path) -> Result<(), EnvError> {
    fs::create_dir_all(staging).map_err(|e| EnvError::io(staging, e))?;
    let file = fs::File::open(archive).map_err(|e| EnvError::io(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.unpack(staging)
        .map_err(|e| EnvError::extract(archive, e))
}

async fn expand_zip(archive: &Utf8Path, staging: &Utf8Path) -> Result<(), EnvError> {
    let quote = |p: &Utf8Path| format!("'{}'", p.as_str().replace('\'', "''"));
    let script = format!(
        "Expand-Archive -LiteralPath {} -DestinationPath {} -Force",
        quote(archive),
        quote(staging)
    );

    let output = Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", script.as_str()])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| EnvError::extract(archive, e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(EnvError::extract(
            archive,
            String::from_utf8_lossy(&output.stderr).trim(),
        ))
    }
}

/// Moves the unpacked JDK from `staging` into `dir`, dropping the archive's
/// top-level folder when it has exactly one.
fn promote(staging: &Utf8Path, dir: &Utf8Path) -> Result<(), EnvError> {
    let entries = list_dir(staging)?;
    let root = match entries.as_slice() {
        [only] if only.is_dir() => only.clone(),
        _ => staging.to_owned(),
    };

    for entry in list_dir(&root)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = dir.join(name);
        remove_existing(&target)?;
        fs::rename(&entry, &target).map_err(|e| EnvError::io(&target, e))?;
    }

    fs::remove_dir_all(staging).map_err(|e| EnvError::io(staging, e))
}

fn list_dir(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, EnvError> {
    let mut paths = dir
        .read_dir_utf8()
        .map_err(|e| EnvError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path().to_owned()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EnvError::io(dir, e))?;
    paths.sort();
    Ok(paths)
}

fn remove_existing(path: &Utf8Path) -> Result<(), EnvError> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| EnvError::io(path, e))
}

/// Finds the unpacked `java`, preferring the standard layouts.
fn find_java(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    if let Some(path) = managed_java_candidates(dir).into_iter().next() {
        return Some(path);
    }

    WalkBuilder::new(dir)
        .standard_filters(false)
        .build()
        .filter_map(Result::ok)
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .find(|path| {
            path.file_name() == Some(JAVA_BIN)
                && path.parent().and_then(Utf8Path::file_name) == Some("bin")
                && verify_java_path(path)
        })
}
