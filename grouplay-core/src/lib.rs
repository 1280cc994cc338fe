pub mod config;
pub mod insertion;
pub mod util;

mod error;
pub use error::{LogicError, LogicResult};

mod events;
pub use events::SessionEvent;

mod logic;
pub use logic::{Logic, LogicArgs};

mod playback;
pub use playback::{PlayRequest, Player, PlayerError};

mod reconciler;

pub use grouplay_state;
pub use grouplay_state::{
    ApplyOutcome, CurrentTrack, QueueEntry, Role, Session, SortKey, Track, TrackId,
    gs::{self, QueueName},
};
