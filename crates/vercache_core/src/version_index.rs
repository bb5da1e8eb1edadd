//! Ordered version → ids index.

use crate::entity::EntityKey;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Inverse index from version to the ids recorded at that version.
///
/// Buckets are kept in version order so "everything since V" is a tail scan
/// over the map rather than a pass over every record. Empty buckets are
/// removed eagerly, so every bucket present holds at least one id.
#[derive(Debug)]
pub(crate) struct VersionIndex<V: Ord> {
    /// Ordered version to ids mapping.
    buckets: BTreeMap<V, BTreeSet<EntityKey>>,
    /// Total id count across buckets.
    count: usize,
}

impl<V: Ord> VersionIndex<V> {
    /// Creates an empty index.
    pub(crate) fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            count: 0,
        }
    }

    /// Records `id` under `version`. Returns false if it was already there.
    pub(crate) fn insert(&mut self, version: V, id: EntityKey) -> bool {
        let inserted = self.buckets.entry(version).or_default().insert(id);
        if inserted {
            self.count += 1;
        }
        inserted
    }

    /// Removes `id` from the bucket for `version`, dropping the bucket if it
    /// becomes empty.
    pub(crate) fn remove(&mut self, version: &V, id: &str) -> bool {
        let Some(ids) = self.buckets.get_mut(version) else {
            return false;
        };
        if !ids.remove(id) {
            return false;
        }
        self.count -= 1;
        if ids.is_empty() {
            self.buckets.remove(version);
        }
        true
    }

    /// Iterates `(version, id)` pairs with version at or above `from`, in
    /// ascending version order and id order within a bucket.
    pub(crate) fn since<'a>(&'a self, from: &V) -> impl Iterator<Item = (&'a V, &'a EntityKey)> {
        self.buckets
            .range::<V, _>((Bound::Included(from), Bound::Unbounded))
            .flat_map(|(version, ids)| ids.iter().map(move |id| (version, id)))
    }

    /// Iterates every `(version, id)` pair in order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&V, &EntityKey)> {
        self.buckets
            .iter()
            .flat_map(|(version, ids)| ids.iter().map(move |id| (version, id)))
    }

    /// Returns true if `id` is recorded under `version`.
    pub(crate) fn contains(&self, version: &V, id: &str) -> bool {
        self.buckets
            .get(version)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Total number of ids indexed.
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Number of distinct versions.
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Lowest indexed version.
    pub(crate) fn min_version(&self) -> Option<&V> {
        self.buckets.keys().next()
    }
}
