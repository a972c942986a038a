//! The change event source.
//!
//! [`ChangeSource`] bridges the synchronous `notify` watcher to the async
//! runtime. Raw notifications are write-settled by `notify-debouncer-mini`,
//! filtered, classified, and pushed into an unbounded channel that the
//! consumer drains through a [`ChangeStream`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    notify / debouncer threads                   │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Callback   │  │
//! │  │ (notify)         │    │ (write-settle) │    │ (filter +  │  │
//! │  └──────────────────┘    └────────────────┘    │  classify) │  │
//! │                                                └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │ send (never blocks)
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ ChangeSource     │    │ ChangeStream   │ -> DebounceWindow   │
//! │  │ (stop handle)    │    │ (events)       │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The watch is armed before [`ChangeSource::start`] returns, and files
//! that already exist at that point are recorded without producing events.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEventKind, Debouncer, new_debouncer};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use hyt_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{ChangeEvent, ChangeKind};
use crate::filter::FileFilter;

/// Sending half of a change stream.
pub type ChangeSender = mpsc::UnboundedSender<ChangeEvent>;

/// The receiving end of a change event channel.
///
/// The stream ends (`recv` returns `None`) once its [`ChangeSource`] has been
/// stopped and the notify thread has released its sender.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeStream {
    /// Creates a detached channel.
    ///
    /// Anything that can produce [`ChangeEvent`]s may feed a stream this way,
    /// which is how the coordinator is driven without a real filesystem.
    #[must_use]
    pub fn channel() -> (ChangeSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Receives the next change event.
    ///
    /// Cancel safe: no event is lost if the future is dropped before it
    /// completes.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

/// A live recursive watch over a directory tree.
///
/// # Lifecycle
///
/// 1. **Start**: [`ChangeSource::start`] validates the root, records
///    existing paths, and arms the notify watcher. Any failure releases
///    what was acquired.
/// 2. **Events**: settled changes arrive on the returned [`ChangeStream`].
/// 3. **Stop**: [`ChangeSource::stop`] unregisters the OS watch. It is
///    idempotent and also runs on drop.
pub struct ChangeSource {
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    root: Utf8PathBuf,
}

impl std::fmt::Debug for ChangeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSource")
            .field("root", &self.root)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ChangeSource {
    /// Starts watching `root` recursively.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] or [`WatchError::NotADirectory`]
    /// for a bad root, and [`WatchError::Notify`] if the OS watch cannot be
    /// registered.
    pub fn start<F: FileFilter>(
        root: &Utf8Path,
        config: &WatchConfig,
        filter: F,
    ) -> Result<(Self, ChangeStream), WatchError> {
        if !root.exists() {
            return Err(WatchError::path_not_found(root));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.to_owned()));
        }

        let root = root.canonicalize_utf8()?;
        let filter = Arc::new(filter);
        let mut known = snapshot_tree(&root, &filter);
        debug!(path = %root, existing = known.len(), "Recorded existing paths");

        let (tx, stream) = ChangeStream::channel();
        let watch_root = root.clone();

        let mut debouncer = new_debouncer(config.settle(), move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    for event in events {
                        // `AnyContinuous` fires while a path is still being written.
                        if event.kind != DebouncedEventKind::Any {
                            trace!(path = %event.path.display(), "Still being written");
                            continue;
                        }

                        let path = match Utf8PathBuf::try_from(event.path) {
                            Ok(p) => p,
                            Err(e) => {
                                log_event_error(&WatchError::non_utf8_path(e.into_path_buf()));
                                continue;
                            }
                        };

                        if path == watch_root || !filter.should_process(&path) {
                            trace!(path = %path, "Ignored file event");
                            continue;
                        }

                        let Some(kind) = classify(&path, &mut known) else {
                            trace!(path = %path, "No net change");
                            continue;
                        };

                        trace!(path = %path, kind = %kind, "File changed");
                        if tx.send(ChangeEvent::new(path, kind)).is_err() {
                            debug!("Change stream closed, dropping events");
                            return;
                        }
                    }
                }
                Err(err) => log_event_error(&WatchError::from(err)),
            }
        })?;

        debouncer
            .watcher()
            .watch(root.as_std_path(), RecursiveMode::Recursive)?;

        info!(path = %root, settle_ms = config.settle_ms, "File watcher started");

        Ok((
            Self {
                debouncer: Some(debouncer),
                root,
            },
            stream,
        ))
    }

    /// Returns the canonical root being watched.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` until [`stop`](Self::stop) is called.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Unregisters the OS watch. Calling this more than once is a no-op.
    pub fn stop(&mut self) {
        if let Some(debouncer) = self.debouncer.take() {
            drop(debouncer);
            info!(path = %self.root, "File watcher stopped");
        }
    }
}

impl Drop for ChangeSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Collects every non-ignored path under `root` so later events can tell
/// additions from modifications.
fn snapshot_tree<F: FileFilter>(root: &Utf8Path, filter: &Arc<F>) -> FxHashSet<Utf8PathBuf> {
    let walk_filter = Arc::clone(filter);
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            Utf8Path::from_path(entry.path()).is_some_and(|p| walk_filter.should_process(p))
        })
        .build();

    walker
        .filter_map(|entry| match entry {
            Ok(entry) => Utf8PathBuf::from_path_buf(entry.into_path()).ok(),
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry during initial walk");
                None
            }
        })
        .filter(|path| path.as_path() != root)
        .collect()
}

/// Logs a problem with a single notification at a level matching its
/// severity.
fn log_event_error(err: &WatchError) {
    if err.is_fatal() {
        error!(error = %err, "Watch error");
    } else {
        warn!(error = %err, path = ?err.path(), "Recoverable watch error");
    }
}

/// Decides what a settled notification means for `path`.
///
/// Returns `None` when there is nothing to report: a directory whose
/// metadata changed, or a path that came and went within one settle window.
/// A path that notify reported but that cannot be inspected still counts as
/// modified.
fn classify(path: &Utf8Path, known: &mut FxHashSet<Utf8PathBuf>) -> Option<ChangeKind> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => {
            if known.insert(path.to_owned()) {
                Some(ChangeKind::Added)
            } else if meta.is_dir() {
                None
            } else {
                Some(ChangeKind::Modified)
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let was_known = known.remove(path);
            known.retain(|p| !p.starts_with(path));
            was_known.then_some(ChangeKind::Removed)
        }
        Err(e) => {
            log_event_error(&WatchError::stat(path, e));
            Some(ChangeKind::Modified)
        }
    }
}
