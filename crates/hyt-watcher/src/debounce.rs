//! Coalescing settled changes into rebuild requests.
//!
//! [`DebounceWindow`] keeps a single deadline. Every incoming
//! [`ChangeEvent`] records its path and pushes the deadline to "now plus
//! the quiet period", so a burst of saves (an IDE touching several files at
//! once) yields exactly one [`RebuildRequest`] once the burst is over.
//!
//! ```text
//!  events:   x  x   x                 x
//!  time:  ───┼──┼───┼────────|────────┼────────|──▶
//!                   └── Q ──▶ request └── Q ──▶ request
//! ```

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::events::{ChangeEvent, PendingChanges, RebuildRequest};
use crate::source::ChangeStream;

/// Coalesces a stream of change events into rebuild requests.
///
/// The window owns all of its state, so [`next_request`](Self::next_request)
/// may be dropped mid-wait (for example by `tokio::select!`) and called
/// again without losing recorded changes or resetting the deadline.
#[derive(Debug)]
pub struct DebounceWindow {
    quiet_period: Duration,
    pending: PendingChanges,
    deadline: Option<Instant>,
}

impl DebounceWindow {
    /// Creates a window with the given quiet period.
    #[must_use]
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: PendingChanges::new(),
            deadline: None,
        }
    }

    /// Returns the configured quiet period.
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Returns the changes recorded since the last request.
    #[must_use]
    pub const fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    /// Returns `true` while a request is being held back by the timer.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Records an event and (re)arms the timer.
    pub fn record(&mut self, event: &ChangeEvent) {
        self.pending.insert(&event.path);
        self.deadline = Some(Instant::now() + self.quiet_period);
    }

    /// Waits for the next rebuild request.
    ///
    /// Returns `None` once `events` is closed. Changes still pending at that
    /// point are discarded, since nobody is left to build them.
    pub async fn next_request(&mut self, events: &mut ChangeStream) -> Option<RebuildRequest> {
        loop {
            match self.deadline {
                None => match events.recv().await {
                    Some(event) => self.record(&event),
                    None => return None,
                },
                Some(deadline) => {
                    tokio::select! {
                        biased;
                        event = events.recv() => match event {
                            Some(event) => self.record(&event),
                            None => return None,
                        },
                        () = sleep_until(deadline) => return Some(self.fire()),
                    }
                }
            }
        }
    }

    fn fire(&mut self) -> RebuildRequest {
        let events = self.pending.events_seen();
        let paths = self.pending.take();
        self.deadline = None;

        debug!(
            changed_files = paths.len(),
            events,
            first = %paths.first().map_or("", |p| p.as_str()),
            "Quiet period elapsed"
        );
        RebuildRequest::new(paths.len())
    }
}
