//! A barebones client for the replicated key-value store that backs a grouplay session.
//!
//! The store is modelled as a JSON tree per session:
//!
//! ```text
//! sessions/{session_id}/queue/approved/{track_id} = { title, artist, imageURL, duration, timestamp }
//! sessions/{session_id}/queue/pending/{track_id}  = { ... }
//! sessions/{session_id}/current                   = { id, ..., time_left, paused }
//! ```
//!
//! Two implementations of [`QueueStore`] are provided: [`Client`], which speaks the
//! Firebase Realtime Database REST protocol, and [`MemoryStore`], an in-process tree
//! used for offline sessions and tests.
#![deny(missing_docs)]

mod client;
pub use client::*;

mod payload;
pub use payload::*;

mod store;
pub use store::*;

mod memory;
pub use memory::MemoryStore;

mod queue;

mod request;

mod watch;
