//! Per-agent memory: a bounded, importance-ranked log.
//!
//! Every [`MemoryStore::add`] re-ranks the whole store by importance, then
//! recency, and drops whatever falls past the capacity. Dropped memories
//! are gone for good.
//!
//! Retrieval is lexical: [`MemoryStore::relevant`] counts how many
//! whitespace-separated words of the query also appear in each memory.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use town_types::MemoryEntry;

/// A memory together with its insertion sequence number.
///
/// The sequence breaks timestamp ties so that "more recent" is always
/// well defined, even for memories formed in the same instant.
#[derive(Debug, Clone)]
struct Stored {
    seq: u64,
    entry: MemoryEntry,
}

/// Bounded memory owned by exactly one agent.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    capacity: usize,
    /// Always sorted best first.
    entries: Vec<Stored>,
    next_seq: u64,
}

impl MemoryStore {
    /// Create an empty store holding at most `capacity` memories.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Maximum number of memories retained.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of memories currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Memories from most to least important.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter().map(|stored| &stored.entry)
    }

    /// Record a memory, then re-rank and prune to capacity.
    ///
    /// Importance is clamped into `[0, 1]`.
    pub fn add(&mut self, mut entry: MemoryEntry) {
        entry.importance = entry.importance.clamp(Decimal::ZERO, Decimal::ONE);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.entries.push(Stored { seq, entry });

        self.entries.sort_by(|a, b| {
            b.entry
                .importance
                .cmp(&a.entry.importance)
                .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
                .then_with(|| b.seq.cmp(&a.seq))
        });
        self.entries.truncate(self.capacity);
    }

    /// Contents of the memories sharing words with `context`, best first.
    ///
    /// The score is the number of query words (repeats included) that
    /// occur in the memory, compared case-insensitively. Memories scoring
    /// zero are left out. Equal scores are ordered by importance and then
    /// by store order.
    pub fn relevant(&self, context: &str, limit: usize) -> Vec<String> {
        let query = context.to_lowercase();
        let query_words: Vec<&str> = query.split_whitespace().collect();

        let mut scored: Vec<(usize, &MemoryEntry)> = self
            .iter()
            .filter_map(|entry| {
                let content = entry.content.to_lowercase();
                let words: BTreeSet<&str> = content.split_whitespace().collect();
                let score = query_words.iter().filter(|w| words.contains(*w)).count();
                (score > 0).then_some((score, entry))
            })
            .collect();

        // Stable sort keeps store order among exact ties.
        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b.cmp(score_a).then_with(|| b.importance.cmp(&a.importance))
        });

        scored
            .into_iter()
            .take(limit)
            .map(|(_, entry)| entry.content.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal_macros::dec;

    use super::*;

    fn memory(content: &str, importance: Decimal) -> MemoryEntry {
        MemoryEntry::new(content, importance, Utc::now())
    }

    #[test]
    fn store_never_exceeds_capacity() {
        let mut store = MemoryStore::new(50);
        for i in 0..120 {
            store.add(memory(&format!("event {i}"), dec!(0.5)));
            assert!(store.len() <= 50);
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn retained_set_is_the_top_by_importance_then_recency() {
        let mut rng = StdRng::seed_from_u64(7);
        let start = Utc::now();
        let mut store = MemoryStore::new(50);
        let mut all: Vec<(Decimal, i64, String)> = Vec::new();

        for i in 0..300_i64 {
            let importance = Decimal::new(rng.random_range(0..=10), 1);
            let content = format!("memory {i}");
            let at = start + Duration::seconds(i);
            store.add(MemoryEntry::new(content.clone(), importance, at));
            all.push((importance, i, content));
        }

        all.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        let expected: Vec<String> = all.into_iter().take(50).map(|(_, _, c)| c).collect();
        let kept: Vec<String> = store.iter().map(|m| m.content.clone()).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn newer_wins_ties_at_equal_timestamp() {
        let now = Utc::now();
        let mut store = MemoryStore::new(1);
        store.add(MemoryEntry::new("first", dec!(0.5), now));
        store.add(MemoryEntry::new("second", dec!(0.5), now));
        assert_eq!(store.iter().next().unwrap().content, "second");
    }

    #[test]
    fn importance_is_clamped() {
        let mut store = MemoryStore::new(5);
        store.add(memory("too much", dec!(3)));
        store.add(memory("too little", dec!(-1)));
        let importances: Vec<Decimal> = store.iter().map(|m| m.importance).collect();
        assert_eq!(importances, vec![Decimal::ONE, Decimal::ZERO]);
    }

    #[test]
    fn relevance_ranks_overlap_then_importance() {
        let mut store = MemoryStore::new(50);
        store.add(memory("ate an apple", dec!(0.3)));
        store.add(memory("saw a banana tree", dec!(0.6)));
        store.add(memory("slept well", dec!(0.9)));
        store.add(memory("apple pie recipe", dec!(0.5)));

        let hits = store.relevant("apple banana", 2);
        assert_eq!(hits, vec!["saw a banana tree", "apple pie recipe"]);

        let all = store.relevant("apple banana", 10);
        assert_eq!(all.len(), 3);
        assert!(!all.iter().any(|m| m == "slept well"));
    }

    #[test]
    fn higher_overlap_beats_importance() {
        let mut store = MemoryStore::new(50);
        store.add(memory("an apple and a banana", dec!(0.1)));
        store.add(memory("one apple", dec!(0.9)));
        let hits = store.relevant("Apple BANANA", 5);
        assert_eq!(hits, vec!["an apple and a banana", "one apple"]);
    }

    #[test]
    fn relevance_is_lexical_only() {
        let mut store = MemoryStore::new(50);
        store.add(memory("Talked to Bob: hello!", dec!(0.7)));
        assert!(store.relevant("conversation with Bob", 5).is_empty());
        assert_eq!(store.relevant("talked about the weather", 5).len(), 1);
        assert!(store.relevant("", 5).is_empty());
    }
}
