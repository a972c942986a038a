//! Well-known paths used by hyt.
//!
//! Everything hyt writes for itself lives under `~/.hyt/`:
//!
//! ```text
//! ~/.hyt/
//!  ├── config.json     # persisted HytConfig
//!  └── java25/         # managed Java runtime
//! ```

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ConfigError;

/// Name of the hyt directory inside the home directory.
pub const CONFIG_DIR_NAME: &str = ".hyt";

/// Name of the config file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Name of the managed Java runtime directory inside [`CONFIG_DIR_NAME`].
pub const JAVA_INSTALL_DIR_NAME: &str = "java25";

/// Returns the current user's home directory as a UTF-8 path.
///
/// # Errors
///
/// Returns [`ConfigError::HomeDirUnavailable`] if the platform reports no
/// home directory, or [`ConfigError::InvalidPath`] if it is not UTF-8.
pub fn home_dir() -> Result<Utf8PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
    Utf8PathBuf::from_path_buf(home).map_err(|p| ConfigError::InvalidPath {
        path: Utf8PathBuf::from(p.to_string_lossy().into_owned()),
        reason: "home directory is not valid UTF-8".to_owned(),
    })
}

/// Returns `~/.hyt`.
///
/// # Errors
///
/// See [`home_dir`].
pub fn config_dir() -> Result<Utf8PathBuf, ConfigError> {
    Ok(config_dir_in(&home_dir()?))
}

/// Returns the hyt directory below an explicit home directory.
#[must_use]
pub fn config_dir_in(home: &Utf8Path) -> Utf8PathBuf {
    home.join(CONFIG_DIR_NAME)
}

/// Returns `~/.hyt/config.json`.
///
/// # Errors
///
/// See [`home_dir`].
pub fn config_path() -> Result<Utf8PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Returns `~/.hyt/java25`, where a managed Java runtime is installed.
///
/// # Errors
///
/// See [`home_dir`].
pub fn java_install_dir() -> Result<Utf8PathBuf, ConfigError> {
    Ok(config_dir()?.join(JAVA_INSTALL_DIR_NAME))
}

/// Joins path segments onto a project directory.
///
/// # Examples
///
/// ```
/// use hyt_core::paths::resolve_project_path;
/// use camino::Utf8Path;
///
/// let p = resolve_project_path(Utf8Path::new("/work/plugin"), &["src", "main", "java"]);
/// assert_eq!(p.as_str(), "/work/plugin/src/main/java");
/// ```
#[must_use]
pub fn resolve_project_path(project_dir: &Utf8Path, segments: &[&str]) -> Utf8PathBuf {
    segments
        .iter()
        .fold(project_dir.to_owned(), |acc, segment| acc.join(segment))
}

/// Returns the directory Gradle writes built jars to (`build/libs`).
#[must_use]
pub fn build_output_dir(project_dir: &Utf8Path) -> Utf8PathBuf {
    resolve_project_path(project_dir, &["build", "libs"])
}

/// Checks that `path` exists and is a directory.
///
/// # Errors
///
/// Returns [`ConfigError::MissingDirectory`] if nothing exists at `path`,
/// or [`ConfigError::InvalidPath`] if it exists but is not a directory.
pub fn ensure_dir(path: &Utf8Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingDirectory(path.to_owned()));
    }
    if !path.is_dir() {
        return Err(ConfigError::InvalidPath {
            path: path.to_owned(),
            reason: "not a directory".to_owned(),
        });
    }
    Ok(())
}
