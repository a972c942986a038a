//! Hytale installation discovery.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::error::EnvError;

/// Archive holding the game assets, present in every installation.
pub const ASSETS_ARCHIVE: &str = "Assets.zip";

/// Directory holding the dedicated server.
pub const SERVER_DIR: &str = "Server";

/// A validated game installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInstall {
    root: Utf8PathBuf,
}

impl GameInstall {
    /// Returns the installation root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the path to `Assets.zip`.
    #[must_use]
    pub fn assets_path(&self) -> Utf8PathBuf {
        self.root.join(ASSETS_ARCHIVE)
    }

    /// Returns the path to the `Server` directory.
    #[must_use]
    pub fn server_dir(&self) -> Utf8PathBuf {
        self.root.join(SERVER_DIR)
    }
}

/// Finds the game installation plugins are built against.
pub trait GameInstallLocator {
    /// Returns the installation to use.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::InstallNotFound`] if nothing was found, or
    /// [`EnvError::InvalidInstall`] if an explicit path is not usable.
    fn locate(&self) -> Result<GameInstall, EnvError>;
}

/// Checks a user-supplied installation path.
///
/// Only `Assets.zip` is required here; a user may point at a trimmed
/// installation without the server.
///
/// # Errors
///
/// Returns [`EnvError::InvalidInstall`] describing what is missing.
pub fn verify_install(path: &Utf8Path) -> Result<GameInstall, EnvError> {
    if !path.is_dir() {
        return Err(EnvError::invalid_install(path, "not a directory"));
    }
    if !path.join(ASSETS_ARCHIVE).is_file() {
        return Err(EnvError::invalid_install(path, format!("missing {ASSETS_ARCHIVE}")));
    }
    Ok(GameInstall {
        root: path.to_owned(),
    })
}

/// Returns `true` if `path` looks like a complete installation
/// (`Server/` and `Assets.zip`).
#[must_use]
pub fn is_complete_install(path: &Utf8Path) -> bool {
    path.join(SERVER_DIR).is_dir() && path.join(ASSETS_ARCHIVE).is_file()
}

/// Returns the usual installation directories for this platform.
#[must_use]
pub fn default_search_paths() -> Vec<Utf8PathBuf> {
    let home = hyt_core::paths::home_dir().ok();

    if cfg!(windows) {
        let env = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .map(Utf8PathBuf::from)
        };
        let mut paths = Vec::new();
        if let Some(appdata) = env("APPDATA") {
            paths.push(appdata.join("Hytale"));
            paths.push(appdata.join("Hytale/install/release/package/game/latest"));
        }
        let program_files =
            env("PROGRAMFILES").unwrap_or_else(|| Utf8PathBuf::from("C:\\Program Files"));
        paths.push(program_files.join("Hytale"));
        let program_files_x86 = env("PROGRAMFILES(X86)")
            .unwrap_or_else(|| Utf8PathBuf::from("C:\\Program Files (x86)"));
        paths.push(program_files_x86.join("Hytale"));
        if let Some(local) = env("LOCALAPPDATA") {
            paths.push(local.join("Hytale"));
        }
        paths
    } else if cfg!(target_os = "macos") {
        let mut paths = vec![Utf8PathBuf::from("/Applications/Hytale.app")];
        paths.extend(home.map(|h| h.join("Applications/Hytale.app")));
        paths
    } else {
        let mut paths = vec![Utf8PathBuf::from("/opt/hytale")];
        if let Some(home) = home {
            paths.push(home.join(".hytale"));
            paths.push(home.join("hytale"));
        }
        paths
    }
}

/// Checks an explicit path first, then each search directory in order.
///
/// # Examples
///
/// ```no_run
/// use hyt_env::{GameInstallLocator, SearchPathLocator};
///
/// let install = SearchPathLocator::new().locate()?;
/// println!("assets: {}", install.assets_path());
/// # Ok::<(), hyt_env::EnvError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SearchPathLocator {
    configured: Option<Utf8PathBuf>,
    search_paths: Vec<Utf8PathBuf>,
}

impl Default for SearchPathLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchPathLocator {
    /// Creates a locator over [`default_search_paths`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_search_paths(default_search_paths())
    }

    /// Creates a locator over explicit search directories.
    #[must_use]
    pub fn with_search_paths(search_paths: Vec<Utf8PathBuf>) -> Self {
        Self {
            configured: None,
            search_paths,
        }
    }

    /// Uses `path` as the user's explicit choice.
    #[must_use]
    pub fn with_configured(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.configured = path;
        self
    }

    /// Returns the directories searched when nothing is configured.
    #[must_use]
    pub fn search_paths(&self) -> &[Utf8PathBuf] {
        &self.search_paths
    }
}

impl GameInstallLocator for SearchPathLocator {
    fn locate(&self) -> Result<GameInstall, EnvError> {
        if let Some(path) = &self.configured {
            return verify_install(path);
        }

        for candidate in &self.search_paths {
            if is_complete_install(candidate) {
                info!(path = %candidate, "Found Hytale installation");
                return Ok(GameInstall {
                    root: candidate.clone(),
                });
            }
            debug!(path = %candidate, "No Hytale installation here");
        }
        Err(EnvError::InstallNotFound)
    }
}
