//! Path filtering for watch events.
//!
//! Filtering happens on the notify thread before an event reaches the
//! channel, so ignored paths never count toward a rebuild.
//!
//! # Design
//!
//! The [`FileFilter`] trait is a simple predicate. [`IgnoreFilter`] is the
//! implementation used for projects: it compiles a fixed set of default
//! exclusions plus caller patterns into one gitignore-style matcher,
//! evaluated relative to the watch root.
//!
//! # Examples
//!
//! ```
//! use hyt_watcher::{FileFilter, IgnoreFilter};
//! use camino::Utf8Path;
//!
//! let root = Utf8Path::new("/work/plugin");
//! let filter = IgnoreFilter::new(root, &["*.tmp".to_owned()]).unwrap();
//!
//! assert!(filter.should_process(Utf8Path::new("/work/plugin/src/main/java/Plugin.java")));
//! assert!(!filter.should_process(Utf8Path::new("/work/plugin/build/libs/plugin.jar")));
//! assert!(!filter.should_process(Utf8Path::new("/work/plugin/notes.tmp")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use smallvec::SmallVec;

use crate::error::WatchError;

/// Paths every project watch ignores.
///
/// Build output, the Gradle cache, dependency caches, version-control
/// metadata, and compiled artifacts.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "**/build",
    "**/.gradle",
    "**/node_modules",
    "**/.git",
    "*.class",
    "*.jar",
];

/// A filter for determining which file events to process.
///
/// Filters must be [`Send`] and [`Sync`] because they run on the notify
/// thread.
///
/// # Examples
///
/// ```
/// use hyt_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct JavaOnly;
///
/// impl FileFilter for JavaOnly {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         path.extension() == Some("java")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a change at `path` should be reported.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Gitignore-style exclusions evaluated relative to a watch root.
///
/// A path is ignored when it, or any of its ancestors below the root,
/// matches one of the [`DEFAULT_IGNORE_PATTERNS`] or a caller pattern.
/// Caller patterns may use `!` to re-include something a default excludes.
/// Absolute paths outside the root are always ignored.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: Utf8PathBuf,
    matcher: Gitignore,
    patterns: SmallVec<[String; 8]>,
}

impl IgnoreFilter {
    /// Compiles the default patterns together with `extra` for `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if any pattern is not a valid glob.
    pub fn new(root: &Utf8Path, extra: &[String]) -> Result<Self, WatchError> {
        // Event paths arrive canonicalized; a relative or symlinked root must match them.
        let root = root.canonicalize_utf8().unwrap_or_else(|_| root.to_owned());
        let mut builder = GitignoreBuilder::new(root.as_std_path());
        let mut patterns = SmallVec::new();

        let all = DEFAULT_IGNORE_PATTERNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str));
        for pattern in all {
            builder
                .add_line(None, pattern)
                .map_err(|source| WatchError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    source,
                })?;
            patterns.push(pattern.to_owned());
        }

        let matcher = builder
            .build()
            .map_err(|source| WatchError::InvalidPattern {
                pattern: extra.join(", "),
                source,
            })?;

        Ok(Self {
            root,
            matcher,
            patterns,
        })
    }

    /// Returns the watch root patterns are evaluated against.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns every compiled pattern, defaults first.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns `true` if `path` is excluded.
    ///
    /// `is_dir` only matters for directory-only patterns (those ending in `/`).
    #[must_use]
    pub fn is_ignored(&self, path: &Utf8Path, is_dir: bool) -> bool {
        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => return true,
            }
        } else {
            path
        };

        if relative.as_str().is_empty() {
            return false;
        }

        self.matcher
            .matched_path_or_any_parents(relative.as_std_path(), is_dir)
            .is_ignore()
    }
}

impl FileFilter for IgnoreFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        !self.is_ignored(path, path.is_dir())
    }
}

// Arc-wrapped filters are shared between the initial walk and the notify thread.
impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(extra: &[&str]) -> IgnoreFilter {
        let extra: Vec<String> = extra.iter().map(|s| (*s).to_owned()).collect();
        IgnoreFilter::new(Utf8Path::new("/work/plugin"), &extra).expect("valid patterns")
    }

    #[test]
    fn test_accept_all_filter() {
        let filter = AcceptAllFilter;
        assert!(filter.should_process(Utf8Path::new("anything.txt")));
        assert!(filter.should_process(Utf8Path::new("")));
    }

    #[test]
    fn test_defaults_ignore_build_output() {
        let filter = filter(&[]);
        assert!(filter.is_ignored(Utf8Path::new("build"), true));
        assert!(filter.is_ignored(Utf8Path::new("build/libs/plugin.jar"), false));
        assert!(filter.is_ignored(
            Utf8Path::new("/work/plugin/build/classes/java/main/Plugin.class"),
            false
        ));
        assert!(filter.is_ignored(Utf8Path::new("sub/build/tmp/x.txt"), false));
    }

    #[test]
    fn test_defaults_ignore_caches_and_vcs() {
        let filter = filter(&[]);
        assert!(filter.is_ignored(Utf8Path::new(".gradle/8.10/fileHashes/x.bin"), false));
        assert!(filter.is_ignored(Utf8Path::new("node_modules/pkg/index.js"), false));
        assert!(filter.is_ignored(Utf8Path::new(".git/HEAD"), false));
        assert!(filter.is_ignored(Utf8Path::new(".git"), true));
    }

    #[test]
    fn test_defaults_ignore_compiled_artifacts() {
        let filter = filter(&[]);
        assert!(filter.is_ignored(Utf8Path::new("src/Main.class"), false));
        assert!(filter.is_ignored(Utf8Path::new("libs/server.jar"), false));
    }

    #[test]
    fn test_sources_pass() {
        let filter = filter(&[]);
        assert!(!filter.is_ignored(Utf8Path::new("src/main/java/Plugin.java"), false));
        assert!(!filter.is_ignored(Utf8Path::new("build.gradle"), false));
        assert!(!filter.is_ignored(Utf8Path::new("src/main/resources/manifest.json"), false));
        assert!(!filter.is_ignored(Utf8Path::new("/work/plugin/settings.gradle"), false));
    }

    #[test]
    fn test_root_itself_is_not_ignored() {
        let filter = filter(&[]);
        assert!(!filter.is_ignored(Utf8Path::new("/work/plugin"), true));
    }

    #[test]
    fn test_outside_root_is_ignored() {
        let filter = filter(&[]);
        assert!(filter.is_ignored(Utf8Path::new("/elsewhere/Main.java"), false));
    }

    #[test]
    fn test_caller_patterns_are_unioned() {
        let filter = filter(&["*.tmp", "generated/"]);
        assert!(filter.is_ignored(Utf8Path::new("src/scratch.tmp"), false));
        assert!(filter.is_ignored(Utf8Path::new("generated/Api.java"), false));
        assert!(filter.is_ignored(Utf8Path::new("build/x.txt"), false));
        assert_eq!(filter.patterns().len(), DEFAULT_IGNORE_PATTERNS.len() + 2);
    }

    #[test]
    fn test_caller_can_reinclude() {
        let filter = filter(&["!libs/api.jar"]);
        assert!(!filter.is_ignored(Utf8Path::new("libs/api.jar"), false));
        assert!(filter.is_ignored(Utf8Path::new("libs/other.jar"), false));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = IgnoreFilter::new(Utf8Path::new("/work/plugin"), &["src/[".to_owned()]);
        match result {
            Err(WatchError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "src/["),
            other => panic!("Expected InvalidPattern, got {other:?}"),
        }
    }

    #[test]
    fn test_arc_filter() {
        let filter = std::sync::Arc::new(filter(&[]));
        assert!(filter.should_process(Utf8Path::new("/work/plugin/src/A.java")));
        assert!(!filter.should_process(Utf8Path::new("/work/plugin/A.class")));
    }
}
