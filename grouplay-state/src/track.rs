use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A track ID, as used by the catalog and as the key of a queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub SmolStr);
impl TrackId {
    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is empty. Empty IDs never enter a queue.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        TrackId(SmolStr::new(id))
    }
}
impl From<String> for TrackId {
    fn from(id: String) -> Self {
        TrackId(SmolStr::from(id))
    }
}

/// A queueable track.
///
/// Two tracks with the same [`TrackId`] are the same queue entry; the other
/// fields are descriptive and do not take part in equality.
#[derive(Debug, Clone)]
pub struct Track {
    /// The track ID
    pub id: TrackId,
    /// The track title
    pub title: String,
    /// The track artist
    pub artist: String,
    /// The album art URL
    pub album_image_url: String,
    /// The duration in milliseconds
    pub duration_millis: u64,
}
impl Track {
    /// The duration of the track.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_millis)
    }

    /// The duration of the track in whole seconds.
    pub fn duration_secs(&self) -> u32 {
        u32::try_from(self.duration_millis / 1000).unwrap_or(u32::MAX)
    }
}
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Track {}
impl std::hash::Hash for Track {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_the_track_id() {
        let a = Track {
            id: "t1".into(),
            title: "A".to_string(),
            artist: "X".to_string(),
            album_image_url: String::new(),
            duration_millis: 1,
        };
        let b = Track {
            title: "Renamed".to_string(),
            duration_millis: 2,
            ..a.clone()
        };
        assert_eq!(a, b);
        assert_ne!(
            a,
            Track {
                id: "t2".into(),
                ..a.clone()
            }
        );
    }

    #[test]
    fn duration_secs_truncates() {
        let track = Track {
            id: "t1".into(),
            title: String::new(),
            artist: String::new(),
            album_image_url: String::new(),
            duration_millis: 200_999,
        };
        assert_eq!(track.duration_secs(), 200);
    }
}
