use serde_json::Value;

use crate::{
    CurrentTrack, ParseError, QueueEntry, Session,
    gs::{self, QueueName},
};

/// The result of folding a single child event into a mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// The mirror changed.
    Applied,
    /// The track was already present (or had no ID); nothing changed. Expected for
    /// redelivered events and for the echo of this client's own writes.
    DuplicateNoOp,
    /// The track was not present (or had no ID); nothing changed.
    AbsentNoOp,
}
impl ApplyOutcome {
    /// Whether the mirror changed.
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

/// The result of replacing both mirrors from a snapshot.
#[derive(Debug, Default)]
pub struct SnapshotReport {
    /// The number of entries now in the approved mirror.
    pub approved: usize,
    /// The number of entries now in the pending mirror.
    pub pending: usize,
    /// The entries that could not be parsed and were left out.
    pub skipped: Vec<(QueueName, ParseError)>,
}

/// Reconciliation of the queue mirrors and the current track.
impl Session {
    /// Replace both mirrors with the contents of a snapshot.
    ///
    /// The snapshot is authoritative: entries absent from it are dropped. Entries
    /// that fail to parse are skipped without affecting the rest.
    pub fn apply_snapshot(&mut self, snapshot: &gs::QueueSnapshot) -> SnapshotReport {
        let mut report = SnapshotReport::default();
        for queue in QueueName::ALL {
            let mut entries = vec![];
            for child in snapshot.get(queue) {
                let parsed = if child.key.is_empty() {
                    Err(ParseError::EmptyKey)
                } else {
                    QueueEntry::parse(&child.key, &child.value)
                };
                match parsed {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        tracing::warn!("Skipping {queue} entry from snapshot: {e}");
                        report.skipped.push((queue, e));
                    }
                }
            }
            self.queue_mut(queue).replace(entries);
        }
        report.approved = self.approved.len();
        report.pending = self.pending.len();
        tracing::debug!(
            "Applied snapshot: approved={}, pending={}, skipped={}",
            report.approved,
            report.pending,
            report.skipped.len()
        );
        report
    }

    /// Fold a child-added event into the mirror of `queue`.
    ///
    /// New tracks are appended in arrival order. A track that is already present,
    /// or an empty key, leaves the mirror untouched.
    ///
    /// # Errors
    ///
    /// Returns an error, without touching the mirror, if the payload is malformed.
    pub fn apply_child_added(
        &mut self,
        queue: QueueName,
        key: &str,
        payload: &Value,
    ) -> Result<ApplyOutcome, ParseError> {
        let entry = QueueEntry::parse(key, payload)?;
        let mirror = self.queue_mut(queue);
        if key.is_empty() || mirror.contains(key) {
            tracing::debug!("Ignoring duplicate add of `{key}` to {queue}");
            return Ok(ApplyOutcome::DuplicateNoOp);
        }
        mirror.push(entry);
        tracing::debug!("Added `{key}` to {queue} (len={})", mirror.len());
        Ok(ApplyOutcome::Applied)
    }

    /// Fold a child-removed event into the mirror of `queue`.
    ///
    /// Identity is the key alone: the payload is only checked so that a malformed
    /// one can be logged. Removing an absent track leaves the mirror untouched.
    pub fn apply_child_removed(
        &mut self,
        queue: QueueName,
        key: &str,
        payload: &Value,
    ) -> ApplyOutcome {
        if let Err(e) = QueueEntry::parse(key, payload) {
            tracing::warn!("Removal of `{key}` from {queue} carried a bad payload: {e}");
        }
        let mirror = self.queue_mut(queue);
        if key.is_empty() || mirror.remove(key).is_none() {
            tracing::debug!("Ignoring removal of absent `{key}` from {queue}");
            return ApplyOutcome::AbsentNoOp;
        }
        tracing::debug!("Removed `{key}` from {queue} (len={})", mirror.len());
        ApplyOutcome::Applied
    }

    /// Fold any child event into the matching mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if an added event carries a malformed payload.
    pub fn apply_child_event(&mut self, event: &gs::ChildEvent) -> Result<ApplyOutcome, ParseError> {
        match event {
            gs::ChildEvent::Added { queue, key, value } => {
                self.apply_child_added(*queue, key, value)
            }
            gs::ChildEvent::Removed { queue, key, value } => {
                Ok(self.apply_child_removed(*queue, key, value))
            }
        }
    }

    /// Replace the current track with the contents of the store's `current` node.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the previous current track in place, if the
    /// payload is malformed or lacks a required field.
    pub fn apply_current_snapshot(&mut self, raw: &Value) -> Result<&CurrentTrack, ParseError> {
        let current = CurrentTrack::parse(raw, |id| self.find(id).map(|(_, e)| e.clone()))?;
        tracing::debug!(
            "Current track is now `{}` ({}s left, paused={})",
            current.track.id,
            current.time_left_secs,
            current.paused
        );
        Ok(self.current.insert(current))
    }

    /// Replace the current track after local playback changed.
    pub fn set_current(&mut self, current: Option<CurrentTrack>) {
        self.current = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SortKey, TrackId};
    use serde_json::json;

    fn payload(title: &str, timestamp: i64) -> Value {
        json!({
            "title": title,
            "artist": "X",
            "imageURL": "",
            "duration": 200000,
            "timestamp": timestamp,
        })
    }

    fn ids(session: &Session, queue: QueueName) -> Vec<String> {
        session
            .queue(queue)
            .track_ids()
            .map(TrackId::to_string)
            .collect()
    }

    fn assert_unique(session: &Session) {
        for queue in QueueName::ALL {
            let mut ids = ids(session, queue);
            let len = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), len, "duplicate IDs in {queue}");
        }
    }

    #[test]
    fn repeated_add_is_a_duplicate_no_op() {
        let mut session = Session::new();
        let event = payload("A", 100);
        assert_eq!(
            session
                .apply_child_added(QueueName::Approved, "t1", &event)
                .unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(ids(&session, QueueName::Approved), vec!["t1"]);

        let before = session.approved().clone();
        assert_eq!(
            session
                .apply_child_added(QueueName::Approved, "t1", &event)
                .unwrap(),
            ApplyOutcome::DuplicateNoOp
        );
        assert_eq!(session.approved(), &before);
    }

    #[test]
    fn duplicate_add_keeps_the_first_payload() {
        let mut session = Session::new();
        session
            .apply_child_added(QueueName::Approved, "t1", &payload("First", 1))
            .unwrap();
        session
            .apply_child_added(QueueName::Approved, "t1", &payload("Second", 2))
            .unwrap();
        let entry = session.approved().get("t1").unwrap();
        assert_eq!(entry.track.title, "First");
        assert_eq!(entry.sort_key, SortKey(1));
    }

    #[test]
    fn empty_key_is_never_added() {
        let mut session = Session::new();
        assert_eq!(
            session
                .apply_child_added(QueueName::Pending, "", &payload("A", 1))
                .unwrap(),
            ApplyOutcome::DuplicateNoOp
        );
        assert!(session.pending().is_empty());
    }

    #[test]
    fn malformed_add_never_enters_the_mirror() {
        let mut session = Session::new();
        let err = session
            .apply_child_added(QueueName::Approved, "t1", &json!("garbage"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
        assert!(session.approved().is_empty());
    }

    #[test]
    fn adds_keep_arrival_order_not_key_order() {
        let mut session = Session::new();
        session
            .apply_child_added(QueueName::Approved, "later", &payload("L", 200))
            .unwrap();
        session
            .apply_child_added(QueueName::Approved, "earlier", &payload("E", 100))
            .unwrap();
        assert_eq!(ids(&session, QueueName::Approved), vec!["later", "earlier"]);
    }

    #[test]
    fn removal_is_idempotent() {
        let mut session = Session::new();
        for (id, ts) in [("t1", 1), ("t2", 2)] {
            session
                .apply_child_added(QueueName::Approved, id, &payload(id, ts))
                .unwrap();
        }

        let removal = payload("t1", 1);
        assert_eq!(
            session.apply_child_removed(QueueName::Approved, "t1", &removal),
            ApplyOutcome::Applied
        );
        assert_eq!(ids(&session, QueueName::Approved), vec!["t2"]);
        assert_eq!(
            session.apply_child_removed(QueueName::Approved, "t1", &removal),
            ApplyOutcome::AbsentNoOp
        );
        assert_eq!(ids(&session, QueueName::Approved), vec!["t2"]);
    }

    #[test]
    fn removal_of_absent_track_is_a_no_op() {
        let mut session = Session::new();
        assert_eq!(
            session.apply_child_removed(QueueName::Pending, "ghost", &payload("G", 1)),
            ApplyOutcome::AbsentNoOp
        );
        assert_eq!(
            session.apply_child_removed(QueueName::Pending, "", &payload("G", 1)),
            ApplyOutcome::AbsentNoOp
        );
    }

    #[test]
    fn removal_goes_by_key_even_with_a_bad_payload() {
        let mut session = Session::new();
        session
            .apply_child_added(QueueName::Approved, "t1", &payload("A", 1))
            .unwrap();
        assert_eq!(
            session.apply_child_removed(QueueName::Approved, "t1", &Value::Null),
            ApplyOutcome::Applied
        );
        assert!(session.approved().is_empty());
    }

    #[test]
    fn remove_before_add_lets_the_add_through() {
        let mut session = Session::new();
        assert_eq!(
            session.apply_child_removed(QueueName::Approved, "t1", &payload("A", 1)),
            ApplyOutcome::AbsentNoOp
        );
        assert_eq!(
            session
                .apply_child_added(QueueName::Approved, "t1", &payload("A", 1))
                .unwrap(),
            ApplyOutcome::Applied
        );
    }

    #[test]
    fn arbitrary_event_sequences_match_the_store_key_set() {
        use rand::{Rng as _, SeedableRng as _};
        use std::collections::BTreeSet;

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut session = Session::new();
        let mut model: [BTreeSet<String>; 2] = Default::default();
        let keys = ["a", "b", "c", ""];
        for _ in 0..500 {
            let key = keys[rng.random_range(0..keys.len())];
            let index = rng.random_range(0..2);
            let queue = QueueName::ALL[index];
            let event = if rng.random_bool(1.0 / 3.0) {
                if !key.is_empty() {
                    model[index].remove(key);
                }
                gs::ChildEvent::Removed {
                    queue,
                    key: key.to_string(),
                    value: payload(key, 1),
                }
            } else {
                if !key.is_empty() {
                    model[index].insert(key.to_string());
                }
                gs::ChildEvent::Added {
                    queue,
                    key: key.to_string(),
                    value: payload(key, rng.random_range(0..1000)),
                }
            };
            session.apply_child_event(&event).unwrap();
            assert_unique(&session);
            for (index, queue) in QueueName::ALL.into_iter().enumerate() {
                let mirrored: BTreeSet<String> = ids(&session, queue).into_iter().collect();
                assert_eq!(mirrored, model[index]);
            }
        }
    }

    #[test]
    fn adds_never_leak_across_queues() {
        let mut session = Session::new();
        session
            .apply_child_added(QueueName::Approved, "t1", &payload("A", 1))
            .unwrap();
        session
            .apply_child_added(QueueName::Approved, "t1", &payload("A", 1))
            .unwrap();
        assert!(session.pending().is_empty());
        assert!(session.cross_queue_conflicts().is_empty());

        // An incorrectly sequenced caller can still produce a conflict; it is
        // reported, not resolved.
        session
            .apply_child_added(QueueName::Pending, "t1", &payload("A", 1))
            .unwrap();
        assert_eq!(
            session.cross_queue_conflicts(),
            vec![TrackId::from("t1")]
        );
        assert_eq!(session.approved().len(), 1);
        assert_eq!(session.pending().len(), 1);
    }

    #[test]
    fn snapshot_replaces_rather_than_merges() {
        let mut session = Session::new();
        session
            .apply_child_added(QueueName::Approved, "t1", &payload("A", 1))
            .unwrap();
        session
            .apply_child_added(QueueName::Pending, "t2", &payload("B", 2))
            .unwrap();

        let snapshot = gs::QueueSnapshot {
            approved: vec![],
            pending: vec![gs::RawChild {
                key: "t2".to_string(),
                value: payload("B", 2),
            }],
        };
        let report = session.apply_snapshot(&snapshot);
        assert!(session.approved().is_empty());
        assert_eq!(ids(&session, QueueName::Pending), vec!["t2"]);
        assert_eq!((report.approved, report.pending), (0, 1));
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn snapshot_skips_malformed_entries_only() {
        let mut session = Session::new();
        let snapshot = gs::QueueSnapshot {
            approved: vec![
                gs::RawChild {
                    key: "good".to_string(),
                    value: payload("G", 1),
                },
                gs::RawChild {
                    key: "bad".to_string(),
                    value: json!({ "title": 5 }),
                },
                gs::RawChild {
                    key: String::new(),
                    value: payload("E", 1),
                },
            ],
            pending: vec![],
        };
        let report = session.apply_snapshot(&snapshot);
        assert_eq!(ids(&session, QueueName::Approved), vec!["good"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(
            report
                .skipped
                .iter()
                .all(|(queue, _)| *queue == QueueName::Approved)
        );
    }

    #[test]
    fn current_snapshot_replaces_the_cursor() {
        let mut session = Session::new();
        let current = session
            .apply_current_snapshot(&json!({
                "id": "t1",
                "title": "A",
                "time_left": 90,
                "timestamp": 7,
                "paused": false,
            }))
            .unwrap();
        assert_eq!(current.track.id.as_str(), "t1");
        assert_eq!(current.time_left_secs, 90);
        assert_eq!(current.started_at, SortKey(7));
        assert!(current.paused);
    }

    #[test]
    fn partial_current_snapshot_keeps_the_previous_cursor() {
        let mut session = Session::new();
        session
            .apply_current_snapshot(&json!({ "id": "t1", "time_left": 90, "paused": true }))
            .unwrap();
        let before = session.current().cloned();

        assert!(
            session
                .apply_current_snapshot(&json!({ "id": "t2", "paused": true }))
                .is_err()
        );
        assert!(
            session
                .apply_current_snapshot(&json!({ "time_left": 10, "paused": true }))
                .is_err()
        );
        assert!(session.apply_current_snapshot(&json!(42)).is_err());

        let after = session.current().unwrap();
        assert_eq!(Some(after), before.as_ref());
        assert_eq!(after.time_left_secs, 90);
    }

    #[test]
    fn current_snapshot_merges_fields_from_the_queues() {
        let mut session = Session::new();
        session
            .apply_child_added(QueueName::Pending, "t9", &payload("Queued title", 55))
            .unwrap();
        let current = session
            .apply_current_snapshot(&json!({ "id": "t9", "time_left": 1, "paused": true }))
            .unwrap();
        assert_eq!(current.track.title, "Queued title");
        assert_eq!(current.started_at, SortKey(55));
    }
}
