//! The rebuild coordinator.
//!
//! A [`RebuildCoordinator`] owns at most one watch session. The session is a
//! single tokio task that waits on three things at once:
//!
//! ```text
//!  ChangeSource ──▶ ChangeStream ──▶ DebounceWindow ──▶ BuildSerializer ──▶ BuildRunner
//!                                                            ▲                  │
//!                                                            └──── outcome ─────┘
//! ```
//!
//! - a shutdown signal from [`RebuildCoordinator::stop_watching`]
//! - completion of the build that is running, if any
//! - the next rebuild request from the debounce window
//!
//! Builds run in their own task so the session keeps consuming changes
//! while one is in progress.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use hyt_build::{BuildOutcome, BuildRunner};
use hyt_core::WatchConfig;
use hyt_watcher::{ChangeSource, ChangeStream, DebounceWindow, IgnoreFilter, RebuildRequest};
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::DevError;
use crate::serializer::{Admission, BuildSerializer, Completion};
use crate::status::{BuildState, SessionState, StatusEvent};

/// Drives the edit-rebuild loop for one project at a time.
///
/// # Examples
///
/// ```no_run
/// use hyt_build::GradleRunner;
/// use hyt_core::WatchConfig;
/// use hyt_dev::RebuildCoordinator;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), hyt_dev::DevError> {
/// let mut coordinator = RebuildCoordinator::new(GradleRunner::new());
/// coordinator.start_watching(Utf8Path::new("./my-plugin"), &WatchConfig::default(), |status| {
///     println!("{status}");
/// })?;
///
/// tokio::signal::ctrl_c().await.ok();
/// coordinator.stop_watching();
/// coordinator.wait().await;
/// # Ok(())
/// # }
/// ```
pub struct RebuildCoordinator<R: BuildRunner> {
    runner: Arc<R>,
    session: Option<WatchSession>,
}

struct WatchSession {
    root: Utf8PathBuf,
    state: SessionState,
    source: Option<ChangeSource>,
    shutdown: Option<oneshot::Sender<()>>,
    build_state: watch::Receiver<BuildState>,
    task: Option<JoinHandle<()>>,
}

impl<R: BuildRunner> std::fmt::Debug for RebuildCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildCoordinator")
            .field("root", &self.session.as_ref().map(|s| &s.root))
            .field("state", &self.state())
            .field("build_state", &self.build_state())
            .finish_non_exhaustive()
    }
}

impl<R: BuildRunner> RebuildCoordinator<R> {
    /// Creates a coordinator that builds with `runner`.
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            session: None,
        }
    }

    /// Returns the build runner.
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns the lifecycle state of the current (or last) session.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state)
    }

    /// Returns the build state last published by the session.
    #[must_use]
    pub fn build_state(&self) -> BuildState {
        self.session
            .as_ref()
            .map_or(BuildState::Idle, |session| *session.build_state.borrow())
    }

    /// Starts watching `project_dir` and rebuilding it on change.
    ///
    /// `on_status` is called with [`StatusEvent::Watching`] before this
    /// returns, then with every later transition from the session task.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::AlreadyWatching`] if a session is running,
    /// [`DevError::Config`] for invalid options, and [`DevError::Watch`] if
    /// the watch cannot be armed. No session exists after an error.
    pub fn start_watching<F>(
        &mut self,
        project_dir: &Utf8Path,
        config: &WatchConfig,
        on_status: F,
    ) -> Result<(), DevError>
    where
        F: FnMut(StatusEvent) + Send + 'static,
    {
        if let Some(session) = self
            .session
            .as_ref()
            .filter(|s| s.state == SessionState::Watching)
        {
            return Err(DevError::AlreadyWatching(session.root.clone()));
        }
        config.validate()?;

        let filter = IgnoreFilter::new(project_dir, &config.ignore_patterns)?;
        let (source, events) = ChangeSource::start(project_dir, config, filter)?;
        let root = source.root().to_owned();

        self.spawn_session(root, Some(source), events, config.quiet_period(), on_status);
        Ok(())
    }

    /// Starts a session over an arbitrary change stream.
    pub(crate) fn spawn_session<F>(
        &mut self,
        root: Utf8PathBuf,
        source: Option<ChangeSource>,
        events: ChangeStream,
        quiet_period: Duration,
        mut on_status: F,
    ) where
        F: FnMut(StatusEvent) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(BuildState::Idle);

        let quiet_period_ms = u64::try_from(quiet_period.as_millis()).unwrap_or(u64::MAX);
        info!(path = %root, quiet_period_ms, "Watching for changes");
        on_status(StatusEvent::Watching { root: root.clone() });

        let session_task = SessionTask {
            runner: Arc::clone(&self.runner),
            root: root.clone(),
            window: DebounceWindow::new(quiet_period),
            serializer: BuildSerializer::new(),
            on_status,
            state_tx,
            build_number: 0,
            queued_files: 0,
        };
        let task = tokio::spawn(run_session(session_task, events, shutdown_rx));

        self.session = Some(WatchSession {
            root,
            state: SessionState::Watching,
            source,
            shutdown: Some(shutdown_tx),
            build_state: state_rx,
            task: Some(task),
        });
    }

    /// Stops watching.
    ///
    /// The filesystem watch is released before this returns. A build that is
    /// already running is left to finish and still reports its outcome; a
    /// queued follow-up build is not started. Calling this when not watching
    /// does nothing.
    pub fn stop_watching(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state != SessionState::Watching {
            return;
        }

        if let Some(mut source) = session.source.take() {
            source.stop();
        }
        if let Some(shutdown) = session.shutdown.take() {
            // The task may already have exited if its stream closed.
            let _ = shutdown.send(());
        }
        session.state = SessionState::Stopped;
        info!(path = %session.root, "Stopped watching");
    }

    /// Waits for the session task to exit.
    ///
    /// After [`stop_watching`](Self::stop_watching) this resolves once the
    /// in-flight build (if any) has reported its outcome. Returns
    /// immediately when there is no session.
    pub async fn wait(&mut self) {
        let Some(task) = self.session.as_mut().and_then(|s| s.task.take()) else {
            return;
        };
        if let Err(err) = task.await {
            warn!(error = %err, "Watch session task failed");
        }
    }
}

/// State owned by the session task.
struct SessionTask<R, F> {
    runner: Arc<R>,
    root: Utf8PathBuf,
    window: DebounceWindow,
    serializer: BuildSerializer,
    on_status: F,
    state_tx: watch::Sender<BuildState>,
    build_number: u64,
    queued_files: usize,
}

enum Step {
    Shutdown,
    BuildDone(Result<BuildOutcome, JoinError>),
    Request(Option<RebuildRequest>),
}

async fn run_session<R, F>(
    mut task: SessionTask<R, F>,
    mut events: ChangeStream,
    mut shutdown: oneshot::Receiver<()>,
) where
    R: BuildRunner,
    F: FnMut(StatusEvent) + Send + 'static,
{
    let mut in_flight: Option<JoinHandle<BuildOutcome>> = None;
    let mut accepting = true;

    loop {
        let step = tokio::select! {
            biased;

            _ = &mut shutdown, if accepting => Step::Shutdown,

            joined = async {
                match in_flight.as_mut() {
                    Some(handle) => handle.await,
                    None => future::pending().await,
                }
            } => Step::BuildDone(joined),

            request = task.window.next_request(&mut events), if accepting => Step::Request(request),
        };

        match step {
            Step::Shutdown | Step::Request(None) => {
                accepting = false;
                if in_flight.is_none() {
                    break;
                }
            }
            Step::Request(Some(request)) => match task.serializer.on_request() {
                Admission::Start => {
                    in_flight = Some(task.start_build(request.changed_files));
                }
                Admission::Queue => {
                    task.queued_files += request.changed_files;
                    task.publish();
                    (task.on_status)(StatusEvent::RebuildQueued {
                        changed_files: request.changed_files,
                    });
                }
                Admission::AlreadyQueued => {
                    task.queued_files += request.changed_files;
                }
            },
            Step::BuildDone(joined) => {
                in_flight = None;
                let outcome = joined.unwrap_or_else(|err| BuildOutcome::from_error(&err));
                task.report(outcome);

                let completion = if accepting {
                    task.serializer.on_build_finished()
                } else {
                    if task.serializer.clear() {
                        debug!("Dropping queued rebuild, session is stopping");
                    }
                    Completion::Idle
                };
                match completion {
                    Completion::StartQueued => {
                        let files = std::mem::take(&mut task.queued_files);
                        in_flight = Some(task.start_build(files));
                    }
                    Completion::Idle => task.publish(),
                }

                if !accepting {
                    break;
                }
            }
        }
    }

    task.publish();
    debug!(path = %task.root, builds = task.build_number, "Watch session ended");
}

impl<R, F> SessionTask<R, F>
where
    R: BuildRunner,
    F: FnMut(StatusEvent) + Send + 'static,
{
    fn start_build(&mut self, changed_files: usize) -> JoinHandle<BuildOutcome> {
        self.build_number += 1;
        self.queued_files = 0;
        self.publish();

        info!(build = self.build_number, changed_files, path = %self.root, "Starting build");
        (self.on_status)(StatusEvent::Building {
            build: self.build_number,
            changed_files,
        });

        let runner = Arc::clone(&self.runner);
        let root = self.root.clone();
        tokio::spawn(async move { runner.run(&root).await })
    }

    fn report(&mut self, outcome: BuildOutcome) {
        let build = self.build_number;
        let elapsed_ms = u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX);
        if outcome.success {
            info!(build, elapsed_ms, "Build succeeded");
            (self.on_status)(StatusEvent::BuildSucceeded { build, outcome });
        } else {
            warn!(build, exit_code = ?outcome.exit_code, elapsed_ms, "Build failed");
            (self.on_status)(StatusEvent::BuildFailed { build, outcome });
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.serializer.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hyt_watcher::{ChangeEvent, ChangeKind, ChangeSender};
    use parking_lot::Mutex;
    use tokio::time::{Instant, sleep};

    const Q: Duration = Duration::from_millis(200);
    const BUILD: Duration = Duration::from_secs(2);

    /// A runner that sleeps instead of building and records what it saw.
    #[derive(Default)]
    struct FakeRunner {
        duration: Duration,
        failures: Mutex<VecDeque<bool>>,
        starts: Mutex<Vec<Instant>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl FakeRunner {
        fn new(duration: Duration) -> Self {
            Self {
                duration,
                ..Self::default()
            }
        }

        fn failing_first(duration: Duration) -> Self {
            let runner = Self::new(duration);
            runner.failures.lock().push_back(true);
            runner
        }

        fn runs(&self) -> usize {
            self.starts.lock().len()
        }
    }

    impl BuildRunner for FakeRunner {
        async fn run(&self, _project_dir: &Utf8Path) -> BuildOutcome {
            self.starts.lock().push(Instant::now());
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            sleep(self.duration).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            let fail = self.failures.lock().pop_front().unwrap_or(false);
            let outcome = if fail {
                BuildOutcome::failed(Some(1), "error: cannot find symbol")
            } else {
                BuildOutcome::succeeded("BUILD SUCCESSFUL")
            };
            outcome.with_duration(self.duration)
        }
    }

    type Recorded = Arc<Mutex<Vec<StatusEvent>>>;

    fn session(runner: FakeRunner) -> (RebuildCoordinator<FakeRunner>, ChangeSender, Recorded) {
        let mut coordinator = RebuildCoordinator::new(runner);
        let (tx, events) = ChangeStream::channel();
        let recorded: Recorded = Arc::default();
        let sink = Arc::clone(&recorded);
        coordinator.spawn_session(
            Utf8PathBuf::from("/work/plugin"),
            None,
            events,
            Q,
            move |status| sink.lock().push(status),
        );
        (coordinator, tx, recorded)
    }

    fn touch(tx: &ChangeSender, name: &str) {
        let path = Utf8PathBuf::from(format!("/work/plugin/src/main/java/{name}"));
        tx.send(ChangeEvent::new(path, ChangeKind::Modified))
            .expect("session alive");
    }

    fn labels(recorded: &Recorded) -> Vec<&'static str> {
        recorded.lock().iter().map(StatusEvent::label).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_watching_is_reported_synchronously() {
        let (coordinator, _tx, recorded) = session(FakeRunner::new(BUILD));
        assert_eq!(labels(&recorded), ["watching"]);
        assert_eq!(coordinator.state(), SessionState::Watching);
        assert_eq!(coordinator.build_state(), BuildState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_change_builds_once() {
        let (coordinator, tx, recorded) = session(FakeRunner::new(BUILD));

        touch(&tx, "Plugin.java");
        sleep(Q + Duration::from_millis(50)).await;
        assert_eq!(coordinator.runner().runs(), 1);
        assert_eq!(coordinator.build_state(), BuildState::Building);

        sleep(BUILD * 3).await;
        assert_eq!(coordinator.runner().runs(), 1);
        assert_eq!(coordinator.build_state(), BuildState::Idle);
        assert_eq!(labels(&recorded), ["watching", "building", "build-succeeded"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_builds_without_changes() {
        let (coordinator, _tx, recorded) = session(FakeRunner::new(BUILD));
        sleep(Duration::from_secs(10)).await;
        assert_eq!(coordinator.runner().runs(), 0);
        assert_eq!(labels(&recorded), ["watching"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_builds_once_with_count() {
        let (coordinator, tx, recorded) = session(FakeRunner::new(BUILD));

        for i in 0..5 {
            touch(&tx, &format!("File{i}.java"));
            sleep(Duration::from_millis(10)).await;
        }
        sleep(BUILD * 3).await;

        assert_eq!(coordinator.runner().runs(), 1);
        let building = recorded
            .lock()
            .iter()
            .find_map(|s| match s {
                StatusEvent::Building { changed_files, .. } => Some(*changed_files),
                _ => None,
            });
        assert_eq!(building, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_during_build_triggers_follow_up() {
        let (coordinator, tx, recorded) = session(FakeRunner::new(BUILD));

        touch(&tx, "A.java");
        sleep(Q + Duration::from_millis(100)).await;
        assert_eq!(coordinator.runner().runs(), 1);

        touch(&tx, "B.java");
        sleep(Q + Duration::from_millis(50)).await;
        assert_eq!(coordinator.build_state(), BuildState::BuildQueued);
        assert_eq!(coordinator.runner().runs(), 1);

        sleep(BUILD * 3).await;
        assert_eq!(coordinator.runner().runs(), 2);
        assert_eq!(
            labels(&recorded),
            [
                "watching",
                "building",
                "rebuild-queued",
                "build-succeeded",
                "building",
                "build-succeeded"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_requests_during_build_collapse() {
        let (coordinator, tx, recorded) = session(FakeRunner::new(Duration::from_secs(5)));

        touch(&tx, "A.java");
        sleep(Q + Duration::from_millis(50)).await;

        // Three separate requests, each after its own quiet period.
        let mut last_request = Instant::now();
        for name in ["B.java", "C.java", "D.java"] {
            touch(&tx, name);
            sleep(Q * 2).await;
            last_request = Instant::now();
        }

        sleep(Duration::from_secs(20)).await;
        let runner = coordinator.runner();
        assert_eq!(runner.runs(), 2);
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);
        assert!(runner.starts.lock()[1] >= last_request);

        let queued = labels(&recorded)
            .into_iter()
            .filter(|l| *l == "rebuild-queued")
            .count();
        assert_eq!(queued, 1);

        let follow_up = recorded
            .lock()
            .iter()
            .filter_map(|s| match s {
                StatusEvent::Building { build: 2, changed_files } => Some(*changed_files),
                _ => None,
            })
            .next();
        assert_eq!(follow_up, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_build_keeps_watching() {
        let (coordinator, tx, recorded) = session(FakeRunner::failing_first(BUILD));

        touch(&tx, "Broken.java");
        sleep(Q + BUILD + Duration::from_millis(100)).await;
        assert_eq!(labels(&recorded).last(), Some(&"build-failed"));
        assert_eq!(coordinator.state(), SessionState::Watching);
        assert_eq!(coordinator.build_state(), BuildState::Idle);

        let failed_output = recorded.lock().iter().find_map(|s| match s {
            StatusEvent::BuildFailed { outcome, .. } => Some(outcome.output.clone()),
            _ => None,
        });
        assert_eq!(failed_output.as_deref(), Some("error: cannot find symbol"));

        touch(&tx, "Broken.java");
        sleep(Q + BUILD + Duration::from_millis(100)).await;
        assert_eq!(coordinator.runner().runs(), 2);
        assert_eq!(labels(&recorded).last(), Some(&"build-succeeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_build_reports_outcome() {
        let (mut coordinator, tx, recorded) = session(FakeRunner::new(BUILD));

        touch(&tx, "A.java");
        sleep(Q + Duration::from_millis(100)).await;
        // Queue a follow-up that must not run after the stop.
        touch(&tx, "B.java");
        sleep(Q + Duration::from_millis(50)).await;
        assert_eq!(coordinator.build_state(), BuildState::BuildQueued);

        coordinator.stop_watching();
        assert_eq!(coordinator.state(), SessionState::Stopped);

        coordinator.wait().await;
        assert_eq!(labels(&recorded).last(), Some(&"build-succeeded"));
        assert_eq!(coordinator.runner().runs(), 1);
        assert_eq!(coordinator.build_state(), BuildState::Idle);

        // Changes after the stop are not acted on.
        let _ = tx.send(ChangeEvent::new("/work/plugin/C.java".into(), ChangeKind::Added));
        sleep(Duration::from_secs(10)).await;
        assert_eq!(coordinator.runner().runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_debouncing_discards_pending() {
        let (mut coordinator, tx, recorded) = session(FakeRunner::new(BUILD));

        touch(&tx, "A.java");
        sleep(Q / 2).await;
        coordinator.stop_watching();
        coordinator.wait().await;

        sleep(Duration::from_secs(5)).await;
        assert_eq!(coordinator.runner().runs(), 0);
        assert_eq!(labels(&recorded), ["watching"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut idle = RebuildCoordinator::new(FakeRunner::new(BUILD));
        idle.stop_watching();
        idle.wait().await;
        assert_eq!(idle.state(), SessionState::Idle);

        let (mut coordinator, _tx, _recorded) = session(FakeRunner::new(BUILD));
        coordinator.stop_watching();
        coordinator.stop_watching();
        coordinator.wait().await;
        coordinator.wait().await;
        assert_eq!(coordinator.state(), SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_stream_ends_session() {
        let (mut coordinator, tx, _recorded) = session(FakeRunner::new(BUILD));
        drop(tx);
        coordinator.wait().await;
        assert_eq!(coordinator.runner().runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_builds_never_overlap() {
        let (coordinator, tx, _recorded) = session(FakeRunner::new(Duration::from_millis(700)));

        for i in 0..40 {
            touch(&tx, &format!("F{}.java", i % 7));
            sleep(Duration::from_millis(90 + (i % 5) * 60)).await;
        }
        sleep(Duration::from_secs(10)).await;

        let runner = coordinator.runner();
        assert!(runner.runs() >= 2);
        assert_eq!(runner.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_watching_missing_directory() {
        let mut coordinator = RebuildCoordinator::new(FakeRunner::new(BUILD));
        let result = coordinator.start_watching(
            Utf8Path::new("/definitely/not/a/project"),
            &WatchConfig::default(),
            |_| {},
        );
        assert!(matches!(result, Err(DevError::Watch(_))));
        assert_eq!(coordinator.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_start_watching_rejects_invalid_config() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("utf-8");
        let mut coordinator = RebuildCoordinator::new(FakeRunner::new(BUILD));

        let config = WatchConfig::default().with_quiet_period_ms(0);
        let result = coordinator.start_watching(root, &config, |_| {});
        assert!(matches!(result, Err(DevError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_watching_twice_is_rejected() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8Path::from_path(dir.path()).expect("utf-8");
        let mut coordinator = RebuildCoordinator::new(FakeRunner::new(BUILD));

        coordinator
            .start_watching(root, &WatchConfig::default(), |_| {})
            .expect("first start");
        let second = coordinator.start_watching(root, &WatchConfig::default(), |_| {});
        assert!(matches!(second, Err(DevError::AlreadyWatching(_))));

        coordinator.stop_watching();
        coordinator.wait().await;

        // A stopped coordinator can start a fresh session.
        coordinator
            .start_watching(root, &WatchConfig::default(), |_| {})
            .expect("restart");
        assert_eq!(coordinator.state(), SessionState::Watching);
        coordinator.stop_watching();
    }
}
