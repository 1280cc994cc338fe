use serde::{Deserialize, Serialize};

use crate::{CurrentTrack, Queue, QueueEntry, TrackId, gs::QueueName};

/// How this client takes part in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Proposes tracks; proposals land in the pending queue.
    #[default]
    Guest,
    /// Approves or rejects proposals and drives playback.
    Owner,
}
impl Role {
    /// Returns a human-readable name for the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "Guest",
            Role::Owner => "Owner",
        }
    }
}
impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The local view of a session: both queue mirrors and the current track.
///
/// Mutated only through the reconciliation operations in this crate.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) approved: Queue,
    pub(crate) pending: Queue,
    pub(crate) current: Option<CurrentTrack>,
}
impl Session {
    /// Create an empty session view.
    pub fn new() -> Self {
        Self::default()
    }

    /// The approved queue mirror.
    pub fn approved(&self) -> &Queue {
        &self.approved
    }

    /// The pending queue mirror.
    pub fn pending(&self) -> &Queue {
        &self.pending
    }

    /// The given queue mirror.
    pub fn queue(&self, queue: QueueName) -> &Queue {
        match queue {
            QueueName::Approved => &self.approved,
            QueueName::Pending => &self.pending,
        }
    }

    pub(crate) fn queue_mut(&mut self, queue: QueueName) -> &mut Queue {
        match queue {
            QueueName::Approved => &mut self.approved,
            QueueName::Pending => &mut self.pending,
        }
    }

    /// The track being played, if any.
    pub fn current(&self) -> Option<&CurrentTrack> {
        self.current.as_ref()
    }

    /// Find a track in either queue, approved first.
    pub fn find(&self, id: &str) -> Option<(QueueName, &QueueEntry)> {
        QueueName::ALL
            .into_iter()
            .find_map(|queue| self.queue(queue).get(id).map(|entry| (queue, entry)))
    }

    /// Track IDs present in both queues at once.
    ///
    /// Moving a track between queues is the caller's job; this only reports
    /// moves that were not sequenced correctly.
    pub fn cross_queue_conflicts(&self) -> Vec<TrackId> {
        self.approved
            .track_ids()
            .filter(|id| self.pending.contains(id.as_str()))
            .cloned()
            .collect()
    }
}
