//! Batches of changes exchanged between producers, caches and consumers.
//!
//! A [`Delta`] is what a writer applies; a [`ChangeSet`] is what a reader gets
//! back from [`CacheReader::query_changes_since`](crate::CacheReader::query_changes_since).
//! Both carry the same three parts: upserted entities, deleted ids, and the
//! version to resume from.

use crate::entity::{EntityKey, Versioned};
use serde::{Deserialize, Serialize};

/// An immutable batch of upserts and deletions.
///
/// Applying a delta moves the cache to `next_version`. Within one delta,
/// upserts are applied in order (a later entry for the same id wins) and
/// deletions are applied after all upserts, so an id that is both upserted
/// and deleted ends up deleted.
///
/// On the wire the fields are `upserts`, `deletedIds` and `nextVersion`;
/// missing lists decode as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(
        serialize = "E: Serialize, E::Version: Serialize",
        deserialize = "E: Deserialize<'de>, E::Version: Deserialize<'de>"
    )
)]
pub struct Delta<E: Versioned> {
    /// Entities inserted or replaced, keyed by their own id and version.
    #[serde(default)]
    pub upserts: Vec<E>,
    /// Ids deleted as of `next_version`.
    #[serde(default)]
    pub deleted_ids: Vec<EntityKey>,
    /// Version the cache is at once the batch is fully applied.
    pub next_version: E::Version,
}

impl<E: Versioned> Delta<E> {
    /// Creates an empty delta that only advances the version.
    pub fn new(next_version: E::Version) -> Self {
        Self {
            upserts: Vec::new(),
            deleted_ids: Vec::new(),
            next_version,
        }
    }

    /// Adds an upserted entity.
    #[must_use]
    pub fn with_upsert(mut self, entity: E) -> Self {
        self.upserts.push(entity);
        self
    }

    /// Adds several upserted entities, preserving their order.
    #[must_use]
    pub fn with_upserts(mut self, entities: impl IntoIterator<Item = E>) -> Self {
        self.upserts.extend(entities);
        self
    }

    /// Adds a deleted id.
    #[must_use]
    pub fn with_deleted(mut self, id: impl Into<EntityKey>) -> Self {
        self.deleted_ids.push(id.into());
        self
    }

    /// Adds several deleted ids.
    #[must_use]
    pub fn with_deleted_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityKey>,
    {
        self.deleted_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Returns true if the delta carries no upserts and no deletions.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deleted_ids.is_empty()
    }

    /// Number of upserts plus deletions.
    pub fn change_count(&self) -> usize {
        self.upserts.len() + self.deleted_ids.len()
    }

    /// Ids of the upserted entities, in delta order.
    pub fn upserted_ids(&self) -> impl Iterator<Item = &str> {
        self.upserts.iter().map(E::id)
    }
}

/// The answer to a changes-since query.
///
/// Shaped like a [`Delta`], except that `next_version` is `None` when the
/// cache has never committed anything. Upserts are ordered by ascending
/// version, then id; deleted ids by ascending deletion version, then id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(
        serialize = "E: Serialize, E::Version: Serialize",
        deserialize = "E: Deserialize<'de>, E::Version: Deserialize<'de>"
    )
)]
pub struct ChangeSet<E: Versioned> {
    /// Live entities whose version is at or above the requested one.
    #[serde(default)]
    pub upserts: Vec<E>,
    /// Tombstoned ids whose deletion version is at or above the requested one.
    #[serde(default)]
    pub deleted_ids: Vec<EntityKey>,
    /// The cache's current version; resume the next query from here.
    pub next_version: Option<E::Version>,
}

impl<E: Versioned> ChangeSet<E> {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deleted_ids.is_empty()
    }

    /// Number of upserts plus deletions.
    pub fn change_count(&self) -> usize {
        self.upserts.len() + self.deleted_ids.len()
    }

    /// Converts into a [`Delta`] that can be applied to another cache.
    ///
    /// Returns `None` if the source cache had no version yet.
    pub fn into_delta(self) -> Option<Delta<E>> {
        let next_version = self.next_version?;
        Some(Delta {
            upserts: self.upserts,
            deleted_ids: self.deleted_ids,
            next_version,
        })
    }
}
