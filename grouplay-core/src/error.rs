use crate::{PlayerError, QueueName, TrackId, gs::StoreError, insertion::InsertionKind};

/// A caller intent that did not take effect.
#[derive(Debug)]
pub enum LogicError {
    /// The store rejected or failed the operation
    Store(StoreError),
    /// The intent is reserved for the session owner
    NotOwner {
        /// The name of the intent
        intent: &'static str,
    },
    /// The track is not in the mirror the intent needs it in
    UnknownTrack {
        /// The queue that was searched
        queue: QueueName,
        /// The track that was missing
        id: TrackId,
    },
    /// No free sort key exists for the insertion
    KeySpaceExhausted(InsertionKind),
    /// The player failed to start the track
    Playback(PlayerError),
    /// The reconciliation loop has stopped
    Stopped,
}
impl std::fmt::Display for LogicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicError::Store(e) => write!(f, "{e}"),
            LogicError::NotOwner { intent } => {
                write!(f, "Only the session owner can {intent}")
            }
            LogicError::UnknownTrack { queue, id } => {
                write!(f, "Track `{id}` is not in the {queue} queue")
            }
            LogicError::KeySpaceExhausted(kind) => {
                write!(f, "No sort key is available for {kind:?}")
            }
            LogicError::Playback(e) => write!(f, "Playback failed: {e}"),
            LogicError::Stopped => write!(f, "Session has stopped"),
        }
    }
}
impl std::error::Error for LogicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogicError::Store(e) => Some(e),
            LogicError::Playback(e) => Some(e),
            _ => None,
        }
    }
}
impl From<StoreError> for LogicError {
    fn from(e: StoreError) -> Self {
        LogicError::Store(e)
    }
}
impl From<PlayerError> for LogicError {
    fn from(e: PlayerError) -> Self {
        LogicError::Playback(e)
    }
}
pub type LogicResult<T> = Result<T, LogicError>;
