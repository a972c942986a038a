//! Admission control for builds.
//!
//! ```text
//!            request                    request
//!   Idle ─────────────▶ Building ─────────────▶ BuildQueued ─┐ request
//!    ▲                   │   ▲                     │   ▲     │
//!    └──── finished ─────┘   └───── finished ──────┘   └─────┘
//!                              (start queued build)
//! ```
//!
//! The queue is a single flag: any number of requests during one build
//! collapse into one follow-up build.

use tracing::debug;

use crate::status::BuildState;

/// What to do with a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Nothing was running; start a build now.
    Start,
    /// A build is running; one more will follow it.
    Queue,
    /// A follow-up build is already queued; nothing changes.
    AlreadyQueued,
}

/// What to do when a build finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Nothing was queued; the slot is free.
    Idle,
    /// A request arrived during the build; start the next one now.
    StartQueued,
}

/// The build slot of one watch session.
#[derive(Debug, Default)]
pub struct BuildSerializer {
    state: BuildState,
}

impl BuildSerializer {
    /// Creates an idle serializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> BuildState {
        self.state
    }

    /// Applies a rebuild request.
    pub fn on_request(&mut self) -> Admission {
        let (next, admission) = match self.state {
            BuildState::Idle => (BuildState::Building, Admission::Start),
            BuildState::Building => (BuildState::BuildQueued, Admission::Queue),
            BuildState::BuildQueued => (BuildState::BuildQueued, Admission::AlreadyQueued),
        };
        debug!(from = ?self.state, to = ?next, ?admission, "Rebuild requested");
        self.state = next;
        admission
    }

    /// Applies the completion of the running build, whatever its outcome.
    pub fn on_build_finished(&mut self) -> Completion {
        let (next, completion) = match self.state {
            BuildState::BuildQueued => (BuildState::Building, Completion::StartQueued),
            BuildState::Building | BuildState::Idle => (BuildState::Idle, Completion::Idle),
        };
        debug!(from = ?self.state, to = ?next, ?completion, "Build finished");
        self.state = next;
        completion
    }

    /// Forgets any queued build and frees the slot.
    ///
    /// Returns `true` if a queued build was dropped.
    pub fn clear(&mut self) -> bool {
        let dropped = self.state == BuildState::BuildQueued;
        self.state = BuildState::Idle;
        dropped
    }
}
