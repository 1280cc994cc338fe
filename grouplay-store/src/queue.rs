use futures::{FutureExt as _, future::BoxFuture};

use crate::{
    ChildEventKind, ChildEvents, Client, CurrentPayload, EntryPayload, QueueName, QueueSnapshot,
    QueueStore, SessionSnapshot, StoreResult,
};

/// Queue endpoints.
impl QueueStore for Client {
    fn fetch_queue_snapshot(&self) -> BoxFuture<'_, StoreResult<QueueSnapshot>> {
        async move {
            let url = self.session_url(&["queue"])?;
            QueueSnapshot::from_value(self.get_json(&url).await?)
        }
        .boxed()
    }

    fn fetch_session(&self) -> BoxFuture<'_, StoreResult<SessionSnapshot>> {
        async move {
            let url = self.session_url(&[])?;
            SessionSnapshot::from_value(self.get_json(&url).await?)
        }
        .boxed()
    }

    fn write(
        &self,
        queue: QueueName,
        track_id: String,
        entry: EntryPayload,
    ) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            let url = self.session_url(&["queue", queue.as_str(), &track_id])?;
            tracing::debug!("Writing {track_id} to {queue}");
            self.put_json(&url, &entry).await
        }
        .boxed()
    }

    fn remove(&self, queue: QueueName, track_id: String) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            let url = self.session_url(&["queue", queue.as_str(), &track_id])?;
            tracing::debug!("Removing {track_id} from {queue}");
            self.delete(&url).await
        }
        .boxed()
    }

    fn write_current(&self, current: CurrentPayload) -> BoxFuture<'_, StoreResult<()>> {
        async move {
            let url = self.session_url(&["current"])?;
            self.put_json(&url, &current).await
        }
        .boxed()
    }

    fn subscribe_child_added(&self, queue: QueueName) -> BoxFuture<'_, StoreResult<ChildEvents>> {
        let result = self.watch(queue, ChildEventKind::Added);
        async move { result }.boxed()
    }

    fn subscribe_child_removed(
        &self,
        queue: QueueName,
    ) -> BoxFuture<'_, StoreResult<ChildEvents>> {
        let result = self.watch(queue, ChildEventKind::Removed);
        async move { result }.boxed()
    }
}
