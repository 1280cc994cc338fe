use std::{
    future::poll_fn,
    sync::{Arc, PoisonError, RwLock, RwLockWriteGuard},
    task::Poll,
};

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    ApplyOutcome, CurrentTrack, Session, SessionEvent, TrackId,
    gs::{self, ChildEventKind, QueueName},
};

pub(crate) enum ReconcileMessage {
    /// Start keeping child events so a snapshot fetched from now on can be
    /// brought up to date. Replies with the point to pass as `since`.
    BeginRefresh(oneshot::Sender<u64>),
    /// The fetch for a refresh started at this point failed.
    AbandonRefresh(u64),
    Snapshot {
        snapshot: gs::SessionSnapshot,
        since: Option<u64>,
    },
    LocalCurrent(Option<CurrentTrack>),
    Barrier(oneshot::Sender<()>),
}
pub(crate) type ReconcileTx = mpsc::UnboundedSender<ReconcileMessage>;
pub(crate) type ReconcileRx = mpsc::UnboundedReceiver<ReconcileMessage>;

/// The only writer of a [`Session`]. Every store notification and local change
/// passes through [`Reconciler::run`] one at a time.
pub(crate) struct Reconciler {
    state: Arc<RwLock<Session>>,
    events: broadcast::Sender<SessionEvent>,
    /// Number of child events applied so far.
    seq: u64,
    /// Child events applied while a refresh is outstanding, by sequence number.
    retained: Vec<(u64, gs::ChildEvent)>,
    /// Start points of the refreshes still waiting for their snapshot.
    refreshes: Vec<u64>,
}
impl Reconciler {
    pub fn new(state: Arc<RwLock<Session>>, events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            state,
            events,
            seq: 0,
            retained: vec![],
            refreshes: vec![],
        }
    }

    /// Child events that are already waiting are always applied before the next
    /// control message, so a barrier observes every notification delivered before
    /// it was sent.
    pub async fn run(mut self, mut streams: Vec<gs::ChildEvents>, mut control: ReconcileRx) {
        loop {
            tokio::select! {
                biased;
                Some(event) = next_child_event(&mut streams) => self.observe(event),
                message = control.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
            }
        }
        tracing::debug!("Reconciliation loop stopped");
    }

    pub fn handle(&mut self, message: ReconcileMessage) {
        match message {
            ReconcileMessage::BeginRefresh(tx) => {
                self.refreshes.push(self.seq);
                let _ = tx.send(self.seq);
            }
            ReconcileMessage::AbandonRefresh(since) => self.finish_refresh(since),
            ReconcileMessage::Snapshot { snapshot, since } => {
                self.apply_snapshot(snapshot);
                if let Some(since) = since {
                    self.replay_since(since);
                    self.finish_refresh(since);
                }
            }
            ReconcileMessage::LocalCurrent(current) => {
                self.write_state().set_current(current.clone());
                self.emit(SessionEvent::CurrentChanged(current));
            }
            ReconcileMessage::Barrier(tx) => {
                let _ = tx.send(());
            }
        }
    }

    fn observe(&mut self, event: gs::ChildEvent) {
        self.seq += 1;
        if !self.refreshes.is_empty() {
            self.retained.push((self.seq, event.clone()));
        }
        self.apply_child_event(event);
    }

    /// A snapshot can be older than notifications that were applied while it was
    /// being fetched. Re-applying those restores what the snapshot overwrote.
    fn replay_since(&self, since: u64) {
        let mut state = self.write_state();
        for (_, event) in self.retained.iter().filter(|(seq, _)| *seq > since) {
            if let Err(e) = state.apply_child_event(event) {
                tracing::debug!("Skipping replay of `{}`: {e}", event.key());
            }
        }
    }

    fn finish_refresh(&mut self, since: u64) {
        if let Some(index) = self.refreshes.iter().position(|s| *s == since) {
            self.refreshes.swap_remove(index);
        }
        match self.refreshes.iter().min() {
            Some(&oldest) => self.retained.retain(|(seq, _)| *seq > oldest),
            None => self.retained.clear(),
        }
    }

    fn apply_child_event(&self, event: gs::ChildEvent) {
        let queue = event.queue();
        let kind = event.kind();
        let key = event.key().to_string();

        let (result, conflict) = {
            let mut state = self.write_state();
            let result = state.apply_child_event(&event);
            let conflict = kind == ChildEventKind::Added
                && matches!(result, Ok(ApplyOutcome::Applied))
                && QueueName::ALL
                    .into_iter()
                    .all(|queue| state.queue(queue).contains(&key));
            (result, conflict)
        };

        match result {
            Ok(outcome) => {
                if conflict {
                    tracing::warn!("Track `{key}` is now in both queues");
                }
                let track_id = TrackId::from(key);
                self.emit(SessionEvent::QueueChanged {
                    queue,
                    track_id: track_id.clone(),
                    kind,
                    outcome,
                });
                if conflict {
                    self.emit(SessionEvent::CrossQueueConflict(track_id));
                }
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed {queue} entry `{key}`: {e}");
                self.emit(SessionEvent::ParseFailed {
                    queue: Some(queue),
                    key,
                    error: e.to_string(),
                });
            }
        }
    }

    fn apply_snapshot(&self, snapshot: gs::SessionSnapshot) {
        let mut events = vec![];
        {
            let mut state = self.write_state();
            let report = state.apply_snapshot(&snapshot.queue);
            for (queue, e) in &report.skipped {
                events.push(SessionEvent::ParseFailed {
                    queue: Some(*queue),
                    key: e.key().to_string(),
                    error: e.to_string(),
                });
            }
            events.push(SessionEvent::SnapshotApplied {
                approved: report.approved,
                pending: report.pending,
                skipped: report.skipped.len(),
            });

            if let Some(raw) = &snapshot.current {
                match state.apply_current_snapshot(raw) {
                    Ok(current) => events.push(SessionEvent::CurrentChanged(Some(current.clone()))),
                    Err(e) => {
                        tracing::warn!("Keeping previous current track: {e}");
                        events.push(SessionEvent::ParseFailed {
                            queue: None,
                            key: "current".to_string(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            for id in state.cross_queue_conflicts() {
                tracing::warn!("Track `{id}` is in both queues");
                events.push(SessionEvent::CrossQueueConflict(id));
            }
        }
        for event in events {
            self.emit(event);
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Sending only fails when nobody is listening.
        let _ = self.events.send(event);
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The next event from whichever subscription has one ready. Resolves to `None`
/// once every subscription has closed.
async fn next_child_event(streams: &mut [gs::ChildEvents]) -> Option<gs::ChildEvent> {
    poll_fn(|cx| {
        let mut open = false;
        for stream in streams.iter_mut() {
            match stream.poll_recv(cx) {
                Poll::Ready(Some(event)) => return Poll::Ready(Some(event)),
                Poll::Ready(None) => {}
                Poll::Pending => open = true,
            }
        }
        if open {
            Poll::Pending
        } else {
            Poll::Ready(None)
        }
    })
    .await
}
