//! Event types flowing from the change source to the build serializer.
//!
//! # Event Flow
//!
//! ```text
//! File System Change
//!        │
//!        ▼
//! notify-debouncer-mini (write-settle, 300ms)
//!        │
//!        ▼
//!   ChangeEvent (added / modified / removed)
//!        │
//!        ▼
//!   PendingChanges (deduplicated by path)
//!        │  quiet period elapses
//!        ▼
//!   RebuildRequest
//! ```

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;
use tokio::time::Instant;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The path appeared after the watch was armed.
    Added,
    /// The contents of an existing file changed.
    Modified,
    /// The path no longer exists.
    Removed,
}

impl ChangeKind {
    /// Returns a short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single settled filesystem change.
///
/// # Examples
///
/// ```
/// use hyt_watcher::{ChangeEvent, ChangeKind};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("/work/plugin/src/Main.java"), ChangeKind::Modified);
/// assert_eq!(event.file_name(), Some("Main.java"));
/// assert_eq!(event.kind.to_string(), "modified");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file or directory.
    pub path: Utf8PathBuf,

    /// What happened to the path.
    pub kind: ChangeKind,

    /// When the settled change was observed.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Creates a new event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// The set of paths changed since the last rebuild request.
///
/// Paths keep their first-seen order and are deduplicated, so saving the same
/// file three times within one window counts once.
///
/// # Examples
///
/// ```
/// use hyt_watcher::PendingChanges;
/// use camino::Utf8Path;
///
/// let mut pending = PendingChanges::new();
/// assert!(pending.insert(Utf8Path::new("src/A.java")));
/// assert!(pending.insert(Utf8Path::new("src/B.java")));
/// assert!(!pending.insert(Utf8Path::new("src/A.java")));
/// assert_eq!(pending.len(), 2);
/// assert_eq!(pending.events_seen(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    order: Vec<Utf8PathBuf>,
    seen: FxHashSet<Utf8PathBuf>,
    events: usize,
}

impl PendingChanges {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a changed path. Returns `true` if the path was not yet pending.
    pub fn insert(&mut self, path: &Utf8Path) -> bool {
        self.events += 1;
        if self.seen.contains(path) {
            return false;
        }
        self.seen.insert(path.to_owned());
        self.order.push(path.to_owned());
        true
    }

    /// Number of distinct pending paths.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of raw events recorded, duplicates included.
    #[inline]
    #[must_use]
    pub const fn events_seen(&self) -> usize {
        self.events
    }

    /// Pending paths in first-seen order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.order.iter().map(Utf8PathBuf::as_path)
    }

    /// Empties the set, returning the paths in first-seen order.
    pub fn take(&mut self) -> Vec<Utf8PathBuf> {
        self.seen.clear();
        self.events = 0;
        std::mem::take(&mut self.order)
    }
}

/// A coalesced "something changed since the last build started" signal.
///
/// Carries only diagnostics: every build is a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildRequest {
    /// When the quiet period elapsed and the request was emitted.
    pub triggered_at: Instant,

    /// Number of distinct paths coalesced into this request.
    pub changed_files: usize,
}

impl RebuildRequest {
    /// Creates a request stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(changed_files: usize) -> Self {
        Self {
            triggered_at: Instant::now(),
            changed_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_labels() {
        assert_eq!(ChangeKind::Added.label(), "added");
        assert_eq!(ChangeKind::Modified.label(), "modified");
        assert_eq!(ChangeKind::Removed.to_string(), "removed");
    }

    #[test]
    fn test_change_event_file_name() {
        let event = ChangeEvent::new(
            Utf8PathBuf::from("src/main/java/Plugin.java"),
            ChangeKind::Added,
        );
        assert_eq!(event.file_name(), Some("Plugin.java"));
    }

    #[test]
    fn test_pending_changes_keeps_first_seen_order() {
        let mut pending = PendingChanges::new();
        pending.insert(Utf8Path::new("b.java"));
        pending.insert(Utf8Path::new("a.java"));
        pending.insert(Utf8Path::new("b.java"));

        let paths: Vec<_> = pending.paths().map(Utf8Path::as_str).collect();
        assert_eq!(paths, vec!["b.java", "a.java"]);
    }

    #[test]
    fn test_pending_changes_take_resets() {
        let mut pending = PendingChanges::new();
        pending.insert(Utf8Path::new("a.java"));
        pending.insert(Utf8Path::new("a.java"));

        let taken = pending.take();
        assert_eq!(taken.len(), 1);
        assert!(pending.is_empty());
        assert_eq!(pending.events_seen(), 0);

        // A path taken earlier counts as new again.
        assert!(pending.insert(Utf8Path::new("a.java")));
    }
}
