use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{StoreError, StoreResult};

/// One of the two queues held by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    /// Tracks the owner has accepted; these are played in order.
    Approved,
    /// Tracks proposed by guests and awaiting the owner's decision.
    Pending,
}
impl QueueName {
    /// Both queues, approved first.
    pub const ALL: [QueueName; 2] = [QueueName::Approved, QueueName::Pending];

    /// The queue a track should go into given whether it is pending approval.
    pub fn from_pending(pending: bool) -> Self {
        if pending {
            QueueName::Pending
        } else {
            QueueName::Approved
        }
    }

    /// The name of the queue's node in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Approved => "approved",
            QueueName::Pending => "pending",
        }
    }
}
impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A queue entry as stored under `queue/{approved,pending}/{track_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPayload {
    /// The track title
    pub title: String,
    /// The track artist
    pub artist: String,
    /// The album art URL
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    /// The duration in milliseconds
    pub duration: u64,
    /// The sort key assigned when the entry was written
    pub timestamp: i64,
}

/// The `current` node: the track being played for the whole session.
///
/// Every field is optional on the wire; deciding which ones are required is
/// left to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPayload {
    /// The track ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The track title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The track artist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    /// The album art URL
    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// The duration in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// The sort key of the entry the track was played from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// The remaining play time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<i64>,
    /// The pause flag as written by the session owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

/// An untyped child of a queue node, exactly as the store delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChild {
    /// The child's key (the track ID).
    pub key: String,
    /// The child's value.
    pub value: Value,
}

/// The children of a queue node, keyed by track ID.
pub type Children = BTreeMap<String, Value>;

/// Check that `key` can be used as a single node name in the store.
///
/// Keys must be non-empty and free of `.`, `$`, `#`, `[`, `]`, `/` and control
/// characters.
///
/// # Errors
///
/// Returns [`StoreError::InvalidKey`] otherwise.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |c: char| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control();
    if key.is_empty() || key.contains(invalid) {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Interpret a queue node. A missing node is an empty queue.
pub fn children_from_value(path: &str, value: Value) -> StoreResult<Children> {
    match value {
        Value::Null => Ok(Children::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(StoreError::UnexpectedShape {
            path: path.to_string(),
        }),
    }
}

/// A one-shot read of both queues of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    /// The raw children of the approved queue.
    pub approved: Vec<RawChild>,
    /// The raw children of the pending queue.
    pub pending: Vec<RawChild>,
}
impl QueueSnapshot {
    /// Build a snapshot from the value of a session's `queue` node.
    ///
    /// A missing node, or a missing queue within it, is read as empty: the store
    /// does not keep empty nodes around.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        let mut queues = children_from_value("queue", value)?;
        let mut take = |queue: QueueName| -> StoreResult<Vec<RawChild>> {
            let node = queues.remove(queue.as_str()).unwrap_or(Value::Null);
            Ok(children_from_value(&format!("queue/{queue}"), node)?
                .into_iter()
                .map(|(key, value)| RawChild { key, value })
                .collect())
        };
        Ok(Self {
            approved: take(QueueName::Approved)?,
            pending: take(QueueName::Pending)?,
        })
    }

    /// The raw children of the given queue.
    pub fn get(&self, queue: QueueName) -> &[RawChild] {
        match queue {
            QueueName::Approved => &self.approved,
            QueueName::Pending => &self.pending,
        }
    }
}

/// A one-shot read of a whole session: both queues plus the current track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Both queues.
    pub queue: QueueSnapshot,
    /// The raw `current` node, if present.
    pub current: Option<Value>,
}
impl SessionSnapshot {
    /// Build a snapshot from the value of a session's root node.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        let mut nodes = children_from_value("", value)?;
        Ok(Self {
            queue: QueueSnapshot::from_value(nodes.remove("queue").unwrap_or(Value::Null))?,
            current: nodes.remove("current").filter(|v| !v.is_null()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_queue_node_is_an_empty_snapshot() {
        assert_eq!(
            QueueSnapshot::from_value(Value::Null).unwrap(),
            QueueSnapshot::default()
        );
    }

    #[test]
    fn snapshot_splits_queues() {
        let snapshot = QueueSnapshot::from_value(json!({
            "pending": { "t2": { "title": "B" } },
        }))
        .unwrap();
        assert!(snapshot.approved.is_empty());
        assert_eq!(snapshot.pending.len(), 1);
        assert_eq!(snapshot.get(QueueName::Pending)[0].key, "t2");
    }

    #[test]
    fn non_object_queue_is_rejected() {
        let err = QueueSnapshot::from_value(json!({ "approved": 5 })).unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedShape { path } if path == "queue/approved"));
    }

    #[test]
    fn session_snapshot_reads_current() {
        let snapshot = SessionSnapshot::from_value(json!({
            "queue": { "approved": { "t1": {} } },
            "current": { "id": "t1", "time_left": 10, "paused": false },
        }))
        .unwrap();
        assert_eq!(snapshot.queue.approved.len(), 1);
        assert_eq!(snapshot.current.unwrap()["id"], "t1");
    }

    #[test]
    fn entry_payload_uses_store_field_names() {
        let entry = EntryPayload {
            title: "A".to_string(),
            artist: "X".to_string(),
            image_url: "https://img".to_string(),
            duration: 200_000,
            timestamp: 100,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["imageURL"], "https://img");
        assert_eq!(value["timestamp"], 100);
    }

    #[test]
    fn current_payload_omits_absent_fields() {
        let current = CurrentPayload {
            id: Some("t1".to_string()),
            time_left: Some(30),
            paused: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&current).unwrap(),
            json!({ "id": "t1", "time_left": 30, "paused": true })
        );
    }
}
