//! Configuration structures for the hyt tool.
//!
//! - [`WatchConfig`] - Options for the edit-rebuild loop (quiet period,
//!   write-settle interval, extra ignore globs)
//! - [`HytConfig`] - The persisted user configuration stored in
//!   `~/.hyt/config.json`
//!
//! Both types implement [`Default`] and deserialize with missing fields
//! filled in from those defaults, so a partially written config file is
//! always accepted.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::paths;

/// Default quiet period of the rebuild coalescing window, in milliseconds.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 200;

/// Default write-settle interval of the change event source, in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 300;

/// Options for watching a project and coalescing changes into rebuilds.
///
/// This is the options structure handed to the rebuild coordinator when a
/// watch session starts.
///
/// # Examples
///
/// ```
/// use hyt_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.quiet_period_ms, 200);
/// assert_eq!(config.settle_ms, 300);
/// assert!(config.ignore_patterns.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    /// Length of the debounce window in milliseconds.
    ///
    /// A burst of changes separated by less than this interval produces a
    /// single rebuild once the burst ends.
    pub quiet_period_ms: u64,

    /// How long a file must stay unwritten before its change is reported.
    pub settle_ms: u64,

    /// Additional glob exclusions, on top of the built-in defaults.
    pub ignore_patterns: Vec<String>,
}

impl WatchConfig {
    /// Returns the quiet period as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Returns the write-settle interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Sets the quiet period.
    #[must_use]
    pub const fn with_quiet_period_ms(mut self, quiet_period_ms: u64) -> Self {
        self.quiet_period_ms = quiet_period_ms;
        self
    }

    /// Appends extra ignore globs.
    #[must_use]
    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Checks that the timing options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if either interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quiet_period_ms == 0 {
            return Err(ConfigError::invalid_option(
                "quietPeriodMs",
                "must be greater than zero",
            ));
        }
        if self.settle_ms == 0 {
            return Err(ConfigError::invalid_option(
                "settleMs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            ignore_patterns: Vec::new(),
        }
    }
}

/// Persisted user configuration.
///
/// Remembers the Java runtime and game installation chosen on a previous
/// run, plus the default watch options.
///
/// # Examples
///
/// ```
/// use hyt_core::HytConfig;
///
/// let config: HytConfig = serde_json::from_str(r#"{"javaPath": "/opt/jdk/bin/java"}"#).unwrap();
/// assert_eq!(config.java_path.as_deref().map(|p| p.as_str()), Some("/opt/jdk/bin/java"));
/// assert!(config.hytale_install_path.is_none());
/// assert_eq!(config.watch.quiet_period_ms, 200);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HytConfig {
    /// Path to a validated `java` executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_path: Option<Utf8PathBuf>,

    /// Root of the game installation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hytale_install_path: Option<Utf8PathBuf>,

    /// Default options for `hyt dev`.
    pub watch: WatchConfig,
}

impl HytConfig {
    /// Loads the configuration from `~/.hyt/config.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown, the file cannot be
    /// read, or its contents are not valid JSON.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads the configuration from an explicit path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// Saves the configuration to `~/.hyt/config.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown or the file cannot
    /// be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&paths::config_path()?)
    }

    /// Saves the configuration to an explicit path, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ConfigError::io(path, e))?;
        debug!(path = %path, "Saved config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, path)
    }

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.quiet_period(), Duration::from_millis(200));
        assert_eq!(config.settle(), Duration::from_millis(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_watch_config_wire_format() {
        insta::assert_json_snapshot!(WatchConfig::default(), @r#"
        {
          "quietPeriodMs": 200,
          "settleMs": 300,
          "ignorePatterns": []
        }
        "#);
    }

    #[test]
    fn test_watch_config_builders() {
        let config = WatchConfig::default()
            .with_quiet_period_ms(50)
            .with_ignore_patterns(["*.tmp", "out/"]);
        assert_eq!(config.quiet_period_ms, 50);
        assert_eq!(config.ignore_patterns, vec!["*.tmp", "out/"]);
    }

    #[test]
    fn test_watch_config_rejects_zero_quiet_period() {
        let config = WatchConfig::default().with_quiet_period_ms(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quietPeriodMs"));
    }

    #[test]
    fn test_hyt_config_missing_fields() {
        let json = r#"{"watch": {"ignorePatterns": ["*.log"]}}"#;
        let config: HytConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.watch.ignore_patterns, vec!["*.log"]);
        assert_eq!(config.watch.quiet_period_ms, DEFAULT_QUIET_PERIOD_MS);
        assert!(config.java_path.is_none());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let (_dir, root) = utf8_temp_dir();
        let config = HytConfig::load_from(&root.join("nope.json")).unwrap();
        assert_eq!(config, HytConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, root) = utf8_temp_dir();
        let path = root.join(".hyt").join("config.json");

        let config = HytConfig {
            java_path: Some(Utf8PathBuf::from("/opt/jdk-25/bin/java")),
            hytale_install_path: None,
            watch: WatchConfig::default().with_quiet_period_ms(120),
        };
        config.save_to(&path).unwrap();

        let loaded = HytConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid_json() {
        let (_dir, root) = utf8_temp_dir();
        let path = root.join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = HytConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
