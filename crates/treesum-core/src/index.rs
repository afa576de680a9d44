//! In-memory content-hash index.

use std::collections::HashSet;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::entry::{ContentHash, Entry};

/// Mapping from root-relative path to its last known [`Entry`].
///
/// Iteration follows insertion order, so a decoded index re-encodes its
/// records in the order they were read. Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    entries: IndexMap<CompactString, Entry>,
}

impl Index {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no paths are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for a path.
    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Check if a path is tracked.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace the entry for a path, returning the previous one.
    pub fn insert(&mut self, path: impl Into<CompactString>, entry: Entry) -> Option<Entry> {
        self.entries.insert(path.into(), entry)
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Entry) -> bool) {
        self.entries.retain(|path, entry| keep(path, entry));
    }

    /// Iterate over `(path, entry)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    /// Iterate over tracked paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(CompactString::as_str)
    }

    /// Collect the set of distinct digests in this index.
    pub fn digests(&self) -> HashSet<ContentHash> {
        self.entries.values().map(|entry| entry.digest).collect()
    }
}

impl<P: Into<CompactString>> FromIterator<(P, Entry)> for Index {
    fn from_iter<I: IntoIterator<Item = (P, Entry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(path, entry)| (path.into(), entry)).collect(),
        }
    }
}
