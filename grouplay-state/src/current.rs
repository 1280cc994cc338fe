use serde::Deserialize as _;
use serde_json::Value;

use crate::{ParseError, QueueEntry, SortKey, Track, TrackId, gs};

/// The session-wide playback cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTrack {
    /// The track being played
    pub track: Track,
    /// The remaining play time in seconds
    pub time_left_secs: u32,
    /// The sort key of the entry the track was started from
    pub started_at: SortKey,
    /// Whether playback is paused
    pub paused: bool,
}
impl CurrentTrack {
    /// A freshly started track with its whole duration left to play.
    pub fn started(entry: &QueueEntry) -> Self {
        Self {
            track: entry.track.clone(),
            time_left_secs: entry.track.duration_secs(),
            started_at: entry.sort_key,
            paused: false,
        }
    }

    /// Parse the untyped `current` node.
    ///
    /// Track fields missing from the payload are taken from `known`, the mirrored
    /// entry for the same track if there is one. The ID, the time left and the pause
    /// flag are required. The store's `paused` flag carries the inverse sense of
    /// [`CurrentTrack::paused`].
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or a required field is absent.
    pub fn parse(
        raw: &Value,
        known: impl FnOnce(&str) -> Option<QueueEntry>,
    ) -> Result<Self, ParseError> {
        const KEY: &str = "current";

        let payload =
            gs::CurrentPayload::deserialize(raw).map_err(|source| ParseError::Malformed {
                key: KEY.to_string(),
                source,
            })?;
        let missing = |field: &'static str| ParseError::MissingField {
            key: KEY.to_string(),
            field,
        };

        let id = payload.id.ok_or_else(|| missing("id"))?;
        if id.is_empty() {
            return Err(ParseError::EmptyKey);
        }
        let time_left = payload.time_left.ok_or_else(|| missing("time_left"))?;
        let paused = payload.paused.ok_or_else(|| missing("paused"))?;
        let time_left_secs = u32::try_from(time_left).map_err(|_| ParseError::OutOfRange {
            key: KEY.to_string(),
            field: "time_left",
            value: time_left,
        })?;

        let known = known(&id);
        let known_track = known.as_ref().map(|e| &e.track);
        let track = Track {
            title: payload
                .title
                .or_else(|| known_track.map(|t| t.title.clone()))
                .unwrap_or_default(),
            artist: payload
                .artist
                .or_else(|| known_track.map(|t| t.artist.clone()))
                .unwrap_or_default(),
            album_image_url: payload
                .image_url
                .or_else(|| known_track.map(|t| t.album_image_url.clone()))
                .unwrap_or_default(),
            duration_millis: payload
                .duration
                .or_else(|| known_track.map(|t| t.duration_millis))
                .unwrap_or_default(),
            id: TrackId::from(id),
        };
        let started_at = payload
            .timestamp
            .map(SortKey)
            .or_else(|| known.as_ref().map(|e| e.sort_key))
            .unwrap_or_default();

        Ok(Self {
            track,
            time_left_secs,
            started_at,
            paused: !paused,
        })
    }

    /// The payload to write to the store's `current` node.
    pub fn to_payload(&self) -> gs::CurrentPayload {
        gs::CurrentPayload {
            id: Some(self.track.id.to_string()),
            title: Some(self.track.title.clone()),
            artist: Some(self.track.artist.clone()),
            image_url: Some(self.track.album_image_url.clone()),
            duration: Some(self.track.duration_millis),
            timestamp: Some(self.started_at.0),
            time_left: Some(i64::from(self.time_left_secs)),
            paused: Some(!self.paused),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn known_entry() -> QueueEntry {
        QueueEntry::new(
            Track {
                id: "t1".into(),
                title: "Known".to_string(),
                artist: "X".to_string(),
                album_image_url: "https://img".to_string(),
                duration_millis: 180_000,
            },
            SortKey(42),
        )
    }

    #[test]
    fn parses_full_payload() {
        let current = CurrentTrack::parse(
            &json!({
                "id": "t1",
                "title": "A",
                "artist": "X",
                "duration": 200000,
                "timestamp": 100,
                "time_left": 30,
                "paused": true,
            }),
            |_| None,
        )
        .unwrap();
        assert_eq!(current.track.title, "A");
        assert_eq!(current.time_left_secs, 30);
        assert_eq!(current.started_at, SortKey(100));
        assert!(!current.paused);
    }

    #[test]
    fn missing_track_fields_come_from_the_mirror() {
        let current = CurrentTrack::parse(
            &json!({ "id": "t1", "time_left": 3, "paused": false }),
            |id| (id == "t1").then(known_entry),
        )
        .unwrap();
        assert_eq!(current.track.title, "Known");
        assert_eq!(current.track.duration_millis, 180_000);
        assert_eq!(current.started_at, SortKey(42));
        assert!(current.paused);
    }

    #[test]
    fn required_fields_are_enforced() {
        for (payload, field) in [
            (json!({ "time_left": 3, "paused": false }), "id"),
            (json!({ "id": "t1", "paused": false }), "time_left"),
            (json!({ "id": "t1", "time_left": 3 }), "paused"),
        ] {
            let err = CurrentTrack::parse(&payload, |_| None).unwrap_err();
            assert!(
                matches!(err, ParseError::MissingField { field: f, .. } if f == field),
                "{err}"
            );
        }
    }

    #[test]
    fn negative_time_left_is_rejected() {
        let err = CurrentTrack::parse(
            &json!({ "id": "t1", "time_left": -1, "paused": false }),
            |_| None,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::OutOfRange { value: -1, .. }));
    }

    #[test]
    fn payload_round_trips_the_pause_flag() {
        let mut current = CurrentTrack::started(&known_entry());
        current.paused = true;
        let raw = serde_json::to_value(current.to_payload()).unwrap();
        assert_eq!(raw["paused"], false);
        assert_eq!(CurrentTrack::parse(&raw, |_| None).unwrap(), current);
    }
}
