use std::time::Duration;

use futures::future::BoxFuture;

/// A request to start playing a track from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    /// The catalog URI of the track, e.g. `spotify:track:abc`
    pub uri: String,
    /// The track's position in the approved queue's presentation order
    pub position: usize,
    /// Where to start within the track
    pub offset: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    /// No playback device is available
    Unavailable,
    /// The player reported a failure
    Failed(String),
}
impl std::fmt::Display for PlayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerError::Unavailable => write!(f, "No player is available"),
            PlayerError::Failed(message) => write!(f, "{message}"),
        }
    }
}
impl std::error::Error for PlayerError {}

/// The playback device the session drives.
///
/// The returned future resolves once playback has started.
pub trait Player: Send + Sync {
    fn play(&self, request: PlayRequest) -> BoxFuture<'_, Result<(), PlayerError>>;
}
