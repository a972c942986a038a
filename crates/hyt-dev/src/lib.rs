//! The incremental rebuild loop behind `hyt dev`.
//!
//! [`RebuildCoordinator`] watches a plugin project, coalesces bursts of
//! edits into rebuild requests, and runs at most one build at a time:
//!
//! - a request while idle starts a build
//! - a request during a build queues exactly one follow-up build
//! - further requests while one is queued change nothing
//!
//! Build failures are reported through the status callback and never end
//! the session. Only problems setting the watch up are returned as
//! [`DevError`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod error;
pub mod serializer;
pub mod status;

pub use coordinator::RebuildCoordinator;
pub use error::DevError;
pub use serializer::{Admission, BuildSerializer, Completion};
pub use status::{BuildState, SessionState, StatusEvent};
