//! Choosing sort keys for new queue entries.

use std::{
    collections::HashSet,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::SortKey;

/// Each wall-clock millisecond spans this many sort keys, leaving room for
/// entries inserted ahead of an appended one.
pub const KEYS_PER_MILLI: i64 = 1000;

/// Where a new entry should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionKind {
    /// After everything already queued.
    Append,
    /// Immediately ahead of the entry with the given key.
    InsertBefore(SortKey),
}

/// The sort key for the current wall-clock time.
pub fn wall_clock_key() -> SortKey {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    SortKey(i64::try_from(millis).unwrap_or(i64::MAX / KEYS_PER_MILLI) * KEYS_PER_MILLI)
}

/// Compute a key for `kind` that `is_taken` does not claim.
///
/// An append takes `now`, or the first free key after it. An insertion ahead of
/// `k` takes `k - 1`, or the first free key below that. Returns `None` when the
/// key space runs out.
pub fn compute_sort_key(
    kind: InsertionKind,
    now: SortKey,
    is_taken: impl Fn(SortKey) -> bool,
) -> Option<SortKey> {
    let (mut key, step): (SortKey, fn(SortKey) -> Option<SortKey>) = match kind {
        InsertionKind::Append => (now, SortKey::successor),
        InsertionKind::InsertBefore(before) => (before.predecessor()?, SortKey::predecessor),
    };
    while is_taken(key) {
        key = step(key)?;
    }
    Some(key)
}

/// Issues sort keys for one session, remembering what it has handed out so that
/// appends keep increasing and repeated insertions ahead of the same entry never
/// collide.
#[derive(Debug, Default)]
pub struct InsertionPolicy {
    last_append: Option<SortKey>,
    /// Inserted keys not yet seen in the mirror.
    issued: HashSet<SortKey>,
}
impl InsertionPolicy {
    /// Create a policy that has issued nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a key for `kind` at wall-clock key `now`, avoiding every key already
    /// issued and every key `is_taken` claims.
    ///
    /// Once `is_taken` claims an issued key it no longer needs remembering.
    pub fn issue(
        &mut self,
        kind: InsertionKind,
        now: SortKey,
        is_taken: impl Fn(SortKey) -> bool,
    ) -> Option<SortKey> {
        self.issued.retain(|key| !is_taken(*key));

        let now = match (kind, self.last_append) {
            (InsertionKind::Append, Some(last)) if now <= last => {
                SortKey(last.0.checked_add(KEYS_PER_MILLI)?)
            }
            _ => now,
        };
        let key = compute_sort_key(kind, now, |key| {
            self.issued.contains(&key) || is_taken(key)
        })?;
        match kind {
            InsertionKind::Append => self.last_append = Some(key),
            InsertionKind::InsertBefore(_) => {
                self.issued.insert(key);
            }
        }
        Some(key)
    }

    /// Forget an issued key whose entry never made it into the store.
    pub fn release(&mut self, key: SortKey) {
        self.issued.remove(&key);
    }
}
