use futures::future::BoxFuture;
use serde_json::Value;

use crate::{CurrentPayload, EntryPayload, QueueName, QueueSnapshot, SessionSnapshot, StoreResult};

/// Whether a child event reports an insertion or a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildEventKind {
    /// A key was inserted into a queue.
    Added,
    /// A key was deleted from a queue.
    Removed,
}

/// A notification that a key was inserted into or deleted from a queue.
///
/// Delivery is at-least-once and unordered across keys, so consumers must treat
/// repeated additions and removals of absent keys as no-ops.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildEvent {
    /// A key was inserted.
    Added {
        /// The queue the key belongs to.
        queue: QueueName,
        /// The key (the track ID).
        key: String,
        /// The inserted value.
        value: Value,
    },
    /// A key was deleted.
    Removed {
        /// The queue the key belonged to.
        queue: QueueName,
        /// The key (the track ID).
        key: String,
        /// The last value held by the key.
        value: Value,
    },
}
impl ChildEvent {
    /// Build an event of the given kind.
    pub fn new(kind: ChildEventKind, queue: QueueName, key: String, value: Value) -> Self {
        match kind {
            ChildEventKind::Added => ChildEvent::Added { queue, key, value },
            ChildEventKind::Removed => ChildEvent::Removed { queue, key, value },
        }
    }

    /// The kind of the event.
    pub fn kind(&self) -> ChildEventKind {
        match self {
            ChildEvent::Added { .. } => ChildEventKind::Added,
            ChildEvent::Removed { .. } => ChildEventKind::Removed,
        }
    }

    /// The queue the event concerns.
    pub fn queue(&self) -> QueueName {
        match self {
            ChildEvent::Added { queue, .. } | ChildEvent::Removed { queue, .. } => *queue,
        }
    }

    /// The key the event concerns.
    pub fn key(&self) -> &str {
        match self {
            ChildEvent::Added { key, .. } | ChildEvent::Removed { key, .. } => key,
        }
    }
}

/// A live stream of child events. Dropping the receiver ends the subscription.
pub type ChildEvents = tokio::sync::mpsc::UnboundedReceiver<ChildEvent>;

/// The operations a session store offers, scoped to the session the store is bound to.
///
/// Every operation fails with [`crate::StoreError::NotBound`] if the store has no
/// session binding.
pub trait QueueStore: Send + Sync {
    /// Read both queues once.
    fn fetch_queue_snapshot(&self) -> BoxFuture<'_, StoreResult<QueueSnapshot>>;

    /// Read both queues and the current track once.
    fn fetch_session(&self) -> BoxFuture<'_, StoreResult<SessionSnapshot>>;

    /// Insert or overwrite an entry. Last write wins. Track IDs must pass
    /// [`crate::validate_key`].
    fn write(
        &self,
        queue: QueueName,
        track_id: String,
        entry: EntryPayload,
    ) -> BoxFuture<'_, StoreResult<()>>;

    /// Delete an entry. Deleting a missing entry is not an error.
    fn remove(&self, queue: QueueName, track_id: String) -> BoxFuture<'_, StoreResult<()>>;

    /// Overwrite the `current` node.
    fn write_current(&self, current: CurrentPayload) -> BoxFuture<'_, StoreResult<()>>;

    /// Subscribe to insertions into a queue. Existing children are delivered first.
    fn subscribe_child_added(&self, queue: QueueName) -> BoxFuture<'_, StoreResult<ChildEvents>>;

    /// Subscribe to deletions from a queue.
    fn subscribe_child_removed(&self, queue: QueueName)
    -> BoxFuture<'_, StoreResult<ChildEvents>>;
}
