//! Error types for the hyt-scaffold crate.

use camino::Utf8PathBuf;

/// Errors that can occur while creating a project from a template.
#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    /// The plugin name cannot be used for directories and class names.
    #[error("invalid plugin name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The template directory does not exist.
    #[error("template not found: {0}")]
    TemplateNotFound(Utf8PathBuf),

    /// The destination already has content.
    #[error("destination already exists and is not empty: {0}")]
    DestinationExists(Utf8PathBuf),

    /// Walking the template failed.
    #[error("failed to read template: {0}")]
    Walk(#[from] ignore::Error),

    /// A template path is not valid UTF-8.
    #[error("template path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being read or written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ScaffoldError {
    /// Creates a new [`ScaffoldError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
