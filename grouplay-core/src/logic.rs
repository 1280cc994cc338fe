use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard},
    time::Duration,
};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    CurrentTrack, LogicError, LogicResult, PlayRequest, Player, QueueEntry, Role, Session,
    SessionEvent, SortKey, Track, TrackId,
    gs::{QueueName, QueueStore},
    insertion::{InsertionKind, InsertionPolicy, wall_clock_key},
    reconciler::{ReconcileMessage, ReconcileTx, Reconciler},
};

pub struct LogicArgs {
    pub store: Arc<dyn QueueStore>,
    pub player: Arc<dyn Player>,
    pub role: Role,
    /// Prepended to a track ID to form the URI handed to the player.
    pub catalog_uri_prefix: String,
}

/// A live view of one session.
///
/// Intents write to the store and return; the local mirrors only change once
/// the store's notifications for those writes come back. Use [`Logic::sync`] to
/// wait for notifications that have already been delivered.
pub struct Logic {
    store: Arc<dyn QueueStore>,
    player: Arc<dyn Player>,
    role: Role,
    catalog_uri_prefix: String,
    state: Arc<RwLock<Session>>,
    policy: Mutex<InsertionPolicy>,
    reconcile_tx: ReconcileTx,
    events_tx: broadcast::Sender<SessionEvent>,
    reconcile_handle: JoinHandle<()>,
}
impl Drop for Logic {
    fn drop(&mut self) {
        self.reconcile_handle.abort();
    }
}

impl Logic {
    const EVENT_CAPACITY: usize = 256;

    /// Read the session, subscribe to both queues and start reconciling.
    pub async fn connect(args: LogicArgs) -> LogicResult<Self> {
        let LogicArgs {
            store,
            player,
            role,
            catalog_uri_prefix,
        } = args;

        let snapshot = store.fetch_session().await?;

        // Added subscriptions replay existing children, which covers anything
        // written between the read above and this point.
        let mut streams = vec![];
        for queue in QueueName::ALL {
            streams.push(store.subscribe_child_added(queue).await?);
            streams.push(store.subscribe_child_removed(queue).await?);
        }

        let state = Arc::new(RwLock::new(Session::new()));
        let (events_tx, _) = broadcast::channel(Self::EVENT_CAPACITY);
        let (reconcile_tx, reconcile_rx) = mpsc::unbounded_channel();

        let mut reconciler = Reconciler::new(state.clone(), events_tx.clone());
        reconciler.handle(ReconcileMessage::Snapshot {
            snapshot,
            since: None,
        });
        let reconcile_handle = tokio::spawn(reconciler.run(streams, reconcile_rx));

        {
            let state = state.read().unwrap_or_else(PoisonError::into_inner);
            tracing::info!(
                "Connected as {role}: {} approved, {} pending",
                state.approved().len(),
                state.pending().len()
            );
        }

        Ok(Self {
            store,
            player,
            role,
            catalog_uri_prefix,
            state,
            policy: Mutex::new(InsertionPolicy::new()),
            reconcile_tx,
            events_tx,
            reconcile_handle,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Resolves once every notification delivered so far has been applied.
    pub async fn sync(&self) -> LogicResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(ReconcileMessage::Barrier(tx))?;
        rx.await.map_err(|_| LogicError::Stopped)
    }

    /// Re-read the whole session and replace the local view with it.
    ///
    /// Notifications applied while the read is in flight are applied again on
    /// top of the snapshot, so the view never moves back past them.
    pub async fn refresh(&self) -> LogicResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(ReconcileMessage::BeginRefresh(tx))?;
        let since = rx.await.map_err(|_| LogicError::Stopped)?;

        match self.store.fetch_session().await {
            Ok(snapshot) => self.send(ReconcileMessage::Snapshot {
                snapshot,
                since: Some(since),
            }),
            Err(e) => {
                self.send(ReconcileMessage::AbandonRefresh(since))?;
                Err(e.into())
            }
        }
    }

    /// Append a track to a queue.
    pub async fn enqueue(&self, track: &Track, queue: QueueName) -> LogicResult<SortKey> {
        self.insert(track, queue, InsertionKind::Append).await
    }

    /// Insert a track ahead of the entry holding `before`.
    pub async fn insert_before(
        &self,
        track: &Track,
        queue: QueueName,
        before: SortKey,
    ) -> LogicResult<SortKey> {
        self.insert(track, queue, InsertionKind::InsertBefore(before)).await
    }

    /// Remove a track from a queue. Removing an absent track is not an error.
    pub async fn dequeue(&self, track_id: &TrackId, queue: QueueName) -> LogicResult<()> {
        tracing::debug!("Dequeueing `{track_id}` from {queue}");
        self.store.remove(queue, track_id.to_string()).await?;
        Ok(())
    }

    /// Suggest a track: owners append it straight to the approved queue, guests
    /// to the pending one.
    pub async fn propose(&self, track: &Track) -> LogicResult<SortKey> {
        let queue = match self.role {
            Role::Owner => QueueName::Approved,
            Role::Guest => QueueName::Pending,
        };
        self.enqueue(track, queue).await
    }

    /// Move a pending track into the approved queue.
    pub async fn approve(&self, track_id: &TrackId) -> LogicResult<SortKey> {
        self.require_owner("approve")?;
        let entry = self.mirrored_entry(QueueName::Pending, track_id)?;
        self.dequeue(track_id, QueueName::Pending).await?;
        self.enqueue(&entry.track, QueueName::Approved).await
    }

    /// Drop a pending track.
    pub async fn reject(&self, track_id: &TrackId) -> LogicResult<()> {
        self.require_owner("reject")?;
        self.dequeue(track_id, QueueName::Pending).await
    }

    /// Play an approved track without removing it from the queue.
    pub async fn select(&self, track_id: &TrackId) -> LogicResult<()> {
        self.require_owner("select")?;
        let (position, entry) = {
            let state = self.read_session();
            state
                .approved()
                .sorted_by_key()
                .into_iter()
                .enumerate()
                .find(|(_, entry)| entry.id() == track_id)
                .map(|(position, entry)| (position, entry.clone()))
                .ok_or_else(|| LogicError::UnknownTrack {
                    queue: QueueName::Approved,
                    id: track_id.clone(),
                })?
        };
        self.start_playback(&entry, position).await?;
        self.mark_playing(&entry).await
    }

    /// Take the next approved track off the queue and play it. With nothing left
    /// to play, the current track is cleared. A track the player refuses stays
    /// queued.
    pub async fn advance(&self) -> LogicResult<Option<Track>> {
        self.require_owner("advance")?;
        let head = self.read_session().approved().head_by_key().cloned();
        let Some(entry) = head else {
            tracing::info!("Approved queue is empty, nothing to play");
            self.send(ReconcileMessage::LocalCurrent(None))?;
            return Ok(None);
        };
        self.start_playback(&entry, 0).await?;
        self.dequeue(entry.id(), QueueName::Approved).await?;
        self.mark_playing(&entry).await?;
        Ok(Some(entry.track))
    }

    /// Called by the playback layer when the current track ends.
    pub async fn track_finished(&self) -> LogicResult<Option<Track>> {
        self.advance().await
    }

    /// Write the local current track to the store.
    pub async fn publish_current(&self) -> LogicResult<()> {
        self.require_owner("publish the current track")?;
        let payload = self.read_session().current().map(CurrentTrack::to_payload);
        match payload {
            Some(payload) => self.store.write_current(payload).await?,
            None => tracing::debug!("No current track to publish"),
        }
        Ok(())
    }
}
impl Logic {
    async fn insert(
        &self,
        track: &Track,
        queue: QueueName,
        kind: InsertionKind,
    ) -> LogicResult<SortKey> {
        let sort_key = self.issue_sort_key(kind)?;
        if let Err(e) = self.write(track, queue, sort_key).await {
            self.lock_policy().release(sort_key);
            return Err(e);
        }
        Ok(sort_key)
    }

    async fn write(&self, track: &Track, queue: QueueName, sort_key: SortKey) -> LogicResult<()> {
        tracing::debug!("Writing `{}` to {queue} at {sort_key}", track.id);
        let entry = QueueEntry::new(track.clone(), sort_key);
        self.store
            .write(queue, track.id.to_string(), entry.to_payload())
            .await?;
        Ok(())
    }

    async fn start_playback(&self, entry: &QueueEntry, position: usize) -> LogicResult<()> {
        let request = PlayRequest {
            uri: format!("{}{}", self.catalog_uri_prefix, entry.id()),
            position,
            offset: Duration::ZERO,
        };
        tracing::info!("Playing `{}` ({})", entry.track.title, request.uri);
        self.player.play(request).await?;
        Ok(())
    }

    async fn mark_playing(&self, entry: &QueueEntry) -> LogicResult<()> {
        let current = CurrentTrack::started(entry);
        let payload = current.to_payload();
        self.send(ReconcileMessage::LocalCurrent(Some(current)))?;
        self.store.write_current(payload).await?;
        Ok(())
    }

    fn issue_sort_key(&self, kind: InsertionKind) -> LogicResult<SortKey> {
        let state = self.read_session();
        let mut policy = self.lock_policy();
        policy
            .issue(kind, wall_clock_key(), |key| {
                QueueName::ALL
                    .into_iter()
                    .any(|queue| state.queue(queue).sort_keys().any(|k| k == key))
            })
            .ok_or(LogicError::KeySpaceExhausted(kind))
    }

    fn mirrored_entry(&self, queue: QueueName, track_id: &TrackId) -> LogicResult<QueueEntry> {
        self.read_session()
            .queue(queue)
            .get(track_id.as_str())
            .cloned()
            .ok_or_else(|| LogicError::UnknownTrack {
                queue,
                id: track_id.clone(),
            })
    }

    fn require_owner(&self, intent: &'static str) -> LogicResult<()> {
        match self.role {
            Role::Owner => Ok(()),
            Role::Guest => Err(LogicError::NotOwner { intent }),
        }
    }

    fn send(&self, message: ReconcileMessage) -> LogicResult<()> {
        self.reconcile_tx
            .send(message)
            .map_err(|_| LogicError::Stopped)
    }

    fn lock_policy(&self) -> MutexGuard<'_, InsertionPolicy> {
        self.policy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
