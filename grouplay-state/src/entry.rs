use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ParseError, Track, TrackId, gs};

/// Advisory ordering metadata attached to a queue entry when it is written.
///
/// Larger keys sort later. Appended entries get keys derived from the wall clock
/// in milliseconds; entries inserted ahead of another get a key just below it.
/// The key space is signed so that insertions ahead of a zero key stay
/// representable.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SortKey(pub i64);
impl SortKey {
    /// The smallest representable key. Nothing can be inserted ahead of it.
    pub const MIN: SortKey = SortKey(i64::MIN);

    /// The key immediately before this one, if there is one.
    pub fn predecessor(self) -> Option<SortKey> {
        self.0.checked_sub(1).map(SortKey)
    }

    /// The key immediately after this one, if there is one.
    pub fn successor(self) -> Option<SortKey> {
        self.0.checked_add(1).map(SortKey)
    }
}
impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A track in a queue, with the sort key it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// The queued track
    pub track: Track,
    /// The sort key assigned at insertion time
    pub sort_key: SortKey,
}
impl QueueEntry {
    /// Create an entry.
    pub fn new(track: Track, sort_key: SortKey) -> Self {
        Self { track, sort_key }
    }

    /// The ID of the queued track.
    pub fn id(&self) -> &TrackId {
        &self.track.id
    }

    /// Parse an untyped payload delivered by the store under `key`.
    ///
    /// This is the only place where queue payloads are interpreted.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not an object with the expected fields.
    pub fn parse(key: &str, payload: &Value) -> Result<Self, ParseError> {
        let payload = gs::EntryPayload::deserialize(payload).map_err(|source| {
            ParseError::Malformed {
                key: key.to_string(),
                source,
            }
        })?;
        Ok(Self::from_payload(TrackId::from(key), payload))
    }

    /// Build an entry from a typed payload.
    pub fn from_payload(id: TrackId, payload: gs::EntryPayload) -> Self {
        Self {
            track: Track {
                id,
                title: payload.title,
                artist: payload.artist,
                album_image_url: payload.image_url,
                duration_millis: payload.duration,
            },
            sort_key: SortKey(payload.timestamp),
        }
    }

    /// The payload to write to the store for this entry.
    pub fn to_payload(&self) -> gs::EntryPayload {
        gs::EntryPayload {
            title: self.track.title.clone(),
            artist: self.track.artist.clone(),
            image_url: self.track.album_image_url.clone(),
            duration: self.track.duration_millis,
            timestamp: self.sort_key.0,
        }
    }
}
