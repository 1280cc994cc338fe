//! The in-memory model of a grouplay session, and the rules for folding store
//! reads and child events into it.
//!
//! Everything here is synchronous and free of I/O; ordering and delivery are the
//! caller's concern.
#![deny(missing_docs)]

pub use grouplay_store as gs;

mod error;
pub use error::ParseError;

mod track;
pub use track::{Track, TrackId};

mod entry;
pub use entry::{QueueEntry, SortKey};

mod queue;
pub use queue::Queue;

mod current;
pub use current::CurrentTrack;

mod session;
pub use session::{Role, Session};

mod reconcile;
pub use reconcile::{ApplyOutcome, SnapshotReport};
