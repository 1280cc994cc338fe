use crate::{
    ApplyOutcome, CurrentTrack, TrackId,
    gs::{ChildEventKind, QueueName},
};

/// Something that happened to the local view of the session.
///
/// No-op outcomes are reported too, so that consumers can tell redelivery apart
/// from real failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A child event was folded into a queue mirror.
    QueueChanged {
        queue: QueueName,
        track_id: TrackId,
        kind: ChildEventKind,
        outcome: ApplyOutcome,
    },
    /// A payload from the store could not be parsed and was left out.
    /// `queue` is `None` for the current track.
    ParseFailed {
        queue: Option<QueueName>,
        key: String,
        error: String,
    },
    /// Both mirrors were replaced from a snapshot.
    SnapshotApplied {
        approved: usize,
        pending: usize,
        skipped: usize,
    },
    /// The current track changed.
    CurrentChanged(Option<CurrentTrack>),
    /// A track is present in both queues at once.
    CrossQueueConflict(TrackId),
}
