//! Content-presence comparison between two indexes.
//!
//! A remote path is reported when no local entry has the same digest,
//! regardless of where that content lives locally. Renames and moves are
//! therefore not reported, and two remote paths with the same missing
//! content are both reported.

use std::collections::HashSet;

use serde::Serialize;

use treesum_core::{ContentHash, Index};

/// Result of comparing a local index against a remote one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonReport {
    /// Remote paths whose content is absent locally, in remote order.
    pub missing: Vec<String>,

    /// Number of entries in the local index.
    pub local_entries: usize,

    /// Number of entries in the remote index.
    pub remote_entries: usize,

    /// Distinct digests present in both indexes.
    pub shared_digests: usize,
}

impl ComparisonReport {
    /// Check if every remote content is present locally.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Number of remote paths whose content is missing.
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }
}

/// Compares indexes by content digest.
#[derive(Debug, Default)]
pub struct IndexComparator;

impl IndexComparator {
    /// Create a new comparator.
    pub fn new() -> Self {
        Self
    }

    /// Remote paths whose digest appears nowhere in `local`.
    pub fn missing_from_local<'r>(&self, local: &Index, remote: &'r Index) -> Vec<&'r str> {
        let present = local.digests();
        remote
            .iter()
            .filter(|(_, entry)| !present.contains(&entry.digest))
            .map(|(path, _)| path)
            .collect()
    }

    /// Full comparison report.
    pub fn compare(&self, local: &Index, remote: &Index) -> ComparisonReport {
        let local_digests = local.digests();
        let remote_digests: HashSet<ContentHash> = remote.digests();

        let missing: Vec<String> = remote
            .iter()
            .filter(|(_, entry)| !local_digests.contains(&entry.digest))
            .map(|(path, _)| path.to_string())
            .collect();

        let shared_digests = remote_digests.intersection(&local_digests).count();

        tracing::debug!(
            local = local.len(),
            remote = remote.len(),
            missing = missing.len(),
            shared = shared_digests,
            "indexes compared"
        );

        ComparisonReport {
            missing,
            local_entries: local.len(),
            remote_entries: remote.len(),
            shared_digests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treesum_core::{Entry, Modified, Sha1};

    fn index(entries: &[(&str, &[u8])]) -> Index {
        entries
            .iter()
            .map(|(path, content)| (*path, Entry::new(Modified::new(1, 0), Sha1::digest(content))))
            .collect()
    }

    #[test]
    fn test_missing_by_content() {
        let local = index(&[("A", b"x")]);
        let remote = index(&[("B", b"x"), ("C", b"y")]);

        let comparator = IndexComparator::new();
        assert_eq!(comparator.missing_from_local(&local, &remote), vec!["C"]);
    }

    #[test]
    fn test_same_path_different_content() {
        let local = index(&[("a.txt", b"old")]);
        let remote = index(&[("a.txt", b"new")]);

        let comparator = IndexComparator::new();
        assert_eq!(comparator.missing_from_local(&local, &remote), vec!["a.txt"]);
    }

    #[test]
    fn test_duplicated_remote_content() {
        let local = index(&[]);
        let remote = index(&[("one", b"same"), ("two", b"same")]);

        let report = IndexComparator::new().compare(&local, &remote);
        assert_eq!(report.missing, vec!["one", "two"]);
        assert_eq!(report.shared_digests, 0);
    }

    #[test]
    fn test_report_counts() {
        let local = index(&[("a", b"1"), ("b", b"2"), ("c", b"2")]);
        let remote = index(&[("x", b"2"), ("y", b"3")]);

        let report = IndexComparator::new().compare(&local, &remote);
        assert_eq!(report.local_entries, 3);
        assert_eq!(report.remote_entries, 2);
        assert_eq!(report.shared_digests, 1);
        assert_eq!(report.missing_count(), 1);
        assert!(!report.is_complete());
    }
}
