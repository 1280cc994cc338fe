use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{FutureExt as _, future::BoxFuture};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    ChildEvent, ChildEventKind, ChildEvents, Children, CurrentPayload, EntryPayload, QueueName,
    QueueSnapshot, QueueStore, RawChild, SessionSnapshot, StoreError, StoreResult, validate_key,
};

/// An in-process store holding any number of sessions.
///
/// Clones share the same backing tree, so several handles bound to the same
/// session behave like several clients of one remote store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    session_id: Option<String>,
    sessions: Arc<Mutex<HashMap<String, SessionTree>>>,
}

#[derive(Default)]
struct SessionTree {
    approved: Children,
    pending: Children,
    current: Option<Value>,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    kind: ChildEventKind,
    queue: QueueName,
    tx: mpsc::UnboundedSender<ChildEvent>,
}

impl SessionTree {
    fn children(&self, queue: QueueName) -> &Children {
        match queue {
            QueueName::Approved => &self.approved,
            QueueName::Pending => &self.pending,
        }
    }

    fn children_mut(&mut self, queue: QueueName) -> &mut Children {
        match queue {
            QueueName::Approved => &mut self.approved,
            QueueName::Pending => &mut self.pending,
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        let raw = |children: &Children| {
            children
                .iter()
                .map(|(key, value)| RawChild {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        };
        QueueSnapshot {
            approved: raw(&self.approved),
            pending: raw(&self.pending),
        }
    }

    fn insert(&mut self, queue: QueueName, key: String, value: Value) {
        let is_new = self
            .children_mut(queue)
            .insert(key.clone(), value.clone())
            .is_none();
        if is_new {
            self.notify(ChildEvent::Added { queue, key, value });
        }
    }

    fn delete(&mut self, queue: QueueName, key: String) {
        if let Some(value) = self.children_mut(queue).remove(&key) {
            self.notify(ChildEvent::Removed { queue, key, value });
        }
    }

    /// Deliver an event to every matching subscriber, dropping the ones that hung up.
    fn notify(&mut self, event: ChildEvent) {
        self.subscribers.retain(|s| {
            if s.kind != event.kind() || s.queue != event.queue() {
                return !s.tx.is_closed();
            }
            s.tx.send(event.clone()).is_ok()
        });
    }
}

impl MemoryStore {
    /// Create an empty store with no session binding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store bound to the given session.
    pub fn bound(session_id: impl Into<String>) -> Self {
        Self::new().bind(session_id)
    }

    /// Get a handle to the same backing tree, bound to the given session.
    pub fn bind(&self, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        Self {
            session_id: (!session_id.is_empty()).then_some(session_id),
            sessions: self.sessions.clone(),
        }
    }

    /// Write an arbitrary value as a queue child, bypassing the typed payload.
    ///
    /// Useful for simulating other clients, including misbehaving ones.
    pub fn write_raw(
        &self,
        queue: QueueName,
        key: impl Into<String>,
        value: Value,
    ) -> StoreResult<()> {
        self.with_session(|tree| tree.insert(queue, key.into(), value))
    }

    /// Write an arbitrary value as the `current` node.
    pub fn write_current_raw(&self, value: Value) -> StoreResult<()> {
        self.with_session(|tree| tree.current = Some(value))
    }

    /// Deliver an added event for every child of the queue again, as an
    /// at-least-once store may. Returns the number of events delivered.
    pub fn redeliver(&self, queue: QueueName) -> StoreResult<usize> {
        self.with_session(|tree| {
            let events: Vec<_> = tree
                .children(queue)
                .iter()
                .map(|(key, value)| ChildEvent::Added {
                    queue,
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect();
            let count = events.len();
            for event in events {
                tree.notify(event);
            }
            count
        })
    }

    /// The keys currently held by a queue, in key order.
    pub fn keys(&self, queue: QueueName) -> StoreResult<Vec<String>> {
        self.with_session(|tree| tree.children(queue).keys().cloned().collect())
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut SessionTree) -> T) -> StoreResult<T> {
        let session_id = self.session_id.as_ref().ok_or(StoreError::NotBound)?;
        let mut sessions = self.lock();
        Ok(f(sessions.entry(session_id.clone()).or_default()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionTree>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, kind: ChildEventKind, queue: QueueName) -> StoreResult<ChildEvents> {
        self.with_session(|tree| {
            let (tx, rx) = mpsc::unbounded_channel();
            if kind == ChildEventKind::Added {
                for (key, value) in tree.children(queue) {
                    let _ = tx.send(ChildEvent::Added {
                        queue,
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
            }
            tree.subscribers.push(Subscriber { kind, queue, tx });
            rx
        })
    }
}

impl QueueStore for MemoryStore {
    fn fetch_queue_snapshot(&self) -> BoxFuture<'_, StoreResult<QueueSnapshot>> {
        let result = self.with_session(|tree| tree.snapshot());
        async move { result }.boxed()
    }

    fn fetch_session(&self) -> BoxFuture<'_, StoreResult<SessionSnapshot>> {
        let result = self.with_session(|tree| SessionSnapshot {
            queue: tree.snapshot(),
            current: tree.current.clone(),
        });
        async move { result }.boxed()
    }

    fn write(
        &self,
        queue: QueueName,
        track_id: String,
        entry: EntryPayload,
    ) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            validate_key(&track_id)?;
            let value = serde_json::to_value(entry)?;
            self.write_raw(queue, track_id, value)
        }
        .boxed()
    }

    fn remove(&self, queue: QueueName, track_id: String) -> BoxFuture<'_, StoreResult<()>> {
        let result = validate_key(&track_id)
            .and_then(|()| self.with_session(|tree| tree.delete(queue, track_id)));
        async move { result }.boxed()
    }

    fn write_current(&self, current: CurrentPayload) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            let value = serde_json::to_value(current)?;
            self.write_current_raw(value)
        }
        .boxed()
    }

    fn subscribe_child_added(&self, queue: QueueName) -> BoxFuture<'_, StoreResult<ChildEvents>> {
        let result = self.subscribe(ChildEventKind::Added, queue);
        async move { result }.boxed()
    }

    fn subscribe_child_removed(
        &self,
        queue: QueueName,
    ) -> BoxFuture<'_, StoreResult<ChildEvents>> {
        let result = self.subscribe(ChildEventKind::Removed, queue);
        async move { result }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(timestamp: i64) -> EntryPayload {
        EntryPayload {
            title: "A".to_string(),
            artist: "X".to_string(),
            image_url: String::new(),
            duration: 200_000,
            timestamp,
        }
    }

    #[tokio::test]
    async fn unbound_store_fails_every_operation() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.fetch_queue_snapshot().await,
            Err(StoreError::NotBound)
        ));
        assert!(matches!(
            store
                .write(QueueName::Approved, "t1".to_string(), entry(1))
                .await,
            Err(StoreError::NotBound)
        ));
        assert!(matches!(
            store.remove(QueueName::Approved, "t1".to_string()).await,
            Err(StoreError::NotBound)
        ));
        assert!(matches!(
            store.subscribe_child_added(QueueName::Pending).await,
            Err(StoreError::NotBound)
        ));
    }

    #[tokio::test]
    async fn added_subscription_replays_existing_children() {
        let store = MemoryStore::bound("s");
        store
            .write(QueueName::Approved, "t1".to_string(), entry(1))
            .await
            .unwrap();

        let mut added = store
            .subscribe_child_added(QueueName::Approved)
            .await
            .unwrap();
        assert_eq!(added.recv().await.unwrap().key(), "t1");

        store
            .write(QueueName::Approved, "t2".to_string(), entry(2))
            .await
            .unwrap();
        assert_eq!(added.recv().await.unwrap().key(), "t2");
    }

    #[tokio::test]
    async fn overwrite_does_not_announce_a_new_child() {
        let store = MemoryStore::bound("s");
        let mut added = store
            .subscribe_child_added(QueueName::Approved)
            .await
            .unwrap();
        store
            .write(QueueName::Approved, "t1".to_string(), entry(1))
            .await
            .unwrap();
        store
            .write(QueueName::Approved, "t1".to_string(), entry(2))
            .await
            .unwrap();
        assert_eq!(added.recv().await.unwrap().key(), "t1");
        assert!(added.try_recv().is_err());
    }

    #[tokio::test]
    async fn removing_a_missing_child_is_silent() {
        let store = MemoryStore::bound("s");
        let mut removed = store
            .subscribe_child_removed(QueueName::Pending)
            .await
            .unwrap();
        store
            .remove(QueueName::Pending, "nope".to_string())
            .await
            .unwrap();
        store.write_raw(QueueName::Pending, "t1", json!({})).unwrap();
        store
            .remove(QueueName::Pending, "t1".to_string())
            .await
            .unwrap();
        let event = removed.recv().await.unwrap();
        assert_eq!(event.kind(), ChildEventKind::Removed);
        assert_eq!(event.key(), "t1");
        assert!(removed.try_recv().is_err());
    }

    #[tokio::test]
    async fn keys_the_store_cannot_hold_are_rejected() {
        let store = MemoryStore::bound("s");
        assert!(matches!(
            store
                .write(QueueName::Approved, "a/b".to_string(), entry(1))
                .await,
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(matches!(
            store.remove(QueueName::Approved, "a.b".to_string()).await,
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(store.keys(QueueName::Approved).unwrap().is_empty());
    }

    #[tokio::test]
    async fn handles_share_the_backing_tree_per_session() {
        let owner = MemoryStore::bound("s");
        let guest = owner.bind("s");
        let other = owner.bind("elsewhere");
        guest
            .write(QueueName::Pending, "t1".to_string(), entry(1))
            .await
            .unwrap();
        assert_eq!(owner.keys(QueueName::Pending).unwrap(), vec!["t1"]);
        assert!(other.keys(QueueName::Pending).unwrap().is_empty());
    }

    #[tokio::test]
    async fn redeliver_duplicates_added_events() {
        let store = MemoryStore::bound("s");
        store.write_raw(QueueName::Approved, "t1", json!({})).unwrap();
        let mut added = store
            .subscribe_child_added(QueueName::Approved)
            .await
            .unwrap();
        assert_eq!(store.redeliver(QueueName::Approved).unwrap(), 1);
        assert_eq!(added.recv().await.unwrap().key(), "t1");
        assert_eq!(added.recv().await.unwrap().key(), "t1");
    }

    #[tokio::test]
    async fn session_fetch_includes_current() {
        let store = MemoryStore::bound("s");
        store
            .write_current(CurrentPayload {
                id: Some("t1".to_string()),
                time_left: Some(5),
                paused: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        let snapshot = store.fetch_session().await.unwrap();
        assert_eq!(snapshot.current.unwrap()["id"], "t1");
    }
}
