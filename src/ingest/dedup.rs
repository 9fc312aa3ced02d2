// src/ingest/dedup.rs
use std::collections::HashSet;

use crate::ingest::types::Item;

pub const DEFAULT_PREFIX_LEN: usize = 55;

/// Collapses near-duplicates (overlapping news queries, re-syndicated headlines)
/// by the lower-cased text prefix. First occurrence wins; per-run only.
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    prefix_len: usize,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_LEN)
    }
}

impl Deduplicator {
    pub fn new(prefix_len: usize) -> Self {
        Self {
            prefix_len: prefix_len.max(1),
        }
    }

    /// Lower-cased first `prefix_len` characters (whole text when shorter).
    pub fn key(&self, text: &str) -> String {
        text.to_lowercase().chars().take(self.prefix_len).collect()
    }

    /// Returns (kept, removed_count), preserving arrival order.
    pub fn dedup(&self, items: Vec<Item>) -> (Vec<Item>, usize) {
        let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
        let mut keep = Vec::with_capacity(items.len());
        let mut removed = 0usize;

        for it in items {
            if !seen.insert(self.key(&it.text)) {
                removed += 1;
                continue;
            }
            keep.push(it);
        }

        (keep, removed)
    }
}
