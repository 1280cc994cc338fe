use std::collections::HashSet;

use crate::{QueueEntry, SortKey, TrackId};

/// A local mirror of one of a session's queues.
///
/// Entries are kept in the order their add events arrived; the sort key is carried
/// along for consumers that want a different presentation order. No two entries
/// share a track ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    entries: Vec<QueueEntry>,
}
impl Queue {
    /// The entries in arrival order.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// The track IDs in arrival order.
    pub fn track_ids(&self) -> impl Iterator<Item = &TrackId> {
        self.entries.iter().map(|e| e.id())
    }

    /// Whether the queue holds the given track.
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// The arrival index of the given track.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id().as_str() == id)
    }

    /// The entry for the given track.
    pub fn get(&self, id: &str) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id().as_str() == id)
    }

    /// The entries ordered by sort key. Entries with equal keys keep their arrival order.
    pub fn sorted_by_key(&self) -> Vec<&QueueEntry> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by_key(|e| e.sort_key);
        sorted
    }

    /// The entry with the smallest sort key, i.e. the one that plays next.
    pub fn head_by_key(&self) -> Option<&QueueEntry> {
        self.entries.iter().min_by_key(|e| e.sort_key)
    }

    /// The sort keys held by the queue.
    pub fn sort_keys(&self) -> impl Iterator<Item = SortKey> + '_ {
        self.entries.iter().map(|e| e.sort_key)
    }

    /// Append an entry. The caller has checked the entry is not already present.
    pub(crate) fn push(&mut self, entry: QueueEntry) {
        debug_assert!(!self.contains(entry.id().as_str()));
        self.entries.push(entry);
    }

    /// Remove the entry for the given track, keeping the order of the rest.
    pub(crate) fn remove(&mut self, id: &str) -> Option<QueueEntry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Replace every entry. Later duplicates of a track ID are dropped.
    pub(crate) fn replace(&mut self, entries: impl IntoIterator<Item = QueueEntry>) {
        let mut seen = HashSet::new();
        self.entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.id().clone()))
            .collect();
    }
}

impl<'a> IntoIterator for &'a Queue {
    type Item = &'a QueueEntry;
    type IntoIter = std::slice::Iter<'a, QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Track;

    fn entry(id: &str, key: i64) -> QueueEntry {
        QueueEntry::new(
            Track {
                id: id.into(),
                title: id.to_uppercase(),
                artist: "X".to_string(),
                album_image_url: String::new(),
                duration_millis: 1000,
            },
            SortKey(key),
        )
    }

    fn ids(entries: &[&QueueEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn presentation_order_is_by_key_then_arrival() {
        let mut queue = Queue::default();
        queue.push(entry("late", 30));
        queue.push(entry("early", 10));
        queue.push(entry("tie-a", 20));
        queue.push(entry("tie-b", 20));
        assert_eq!(
            ids(&queue.sorted_by_key()),
            vec!["early", "tie-a", "tie-b", "late"]
        );
        assert_eq!(queue.head_by_key().unwrap().id().as_str(), "early");
        // The mirror itself stays in arrival order.
        assert_eq!(queue.position("late"), Some(0));
    }

    #[test]
    fn remove_keeps_relative_order() {
        let mut queue = Queue::default();
        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            queue.push(entry(id, i as i64));
        }
        assert!(queue.remove("b").is_some());
        assert!(queue.remove("b").is_none());
        assert_eq!(
            queue.track_ids().map(|id| id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
    }

    #[test]
    fn replace_drops_duplicate_ids() {
        let mut queue = Queue::default();
        queue.replace([entry("a", 1), entry("b", 2), entry("a", 3)]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get("a").unwrap().sort_key, SortKey(1));
    }
}
