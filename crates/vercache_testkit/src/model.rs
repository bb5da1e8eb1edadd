//! A naive reference model of the cache.
//!
//! The model keeps one record per id and answers every query with a full
//! scan. It is slow and obviously correct, which makes it a good oracle for
//! property tests against the indexed cache.

use crate::fixtures::TestEntity;
use std::collections::HashMap;
use vercache_core::{ChangeSet, Delta, EntryState};

#[derive(Debug, Clone)]
enum Record {
    Live(TestEntity),
    Deleted(u64),
}

/// Oracle for [`VersionedCache`](vercache_core::VersionedCache) over
/// [`TestEntity`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceModel {
    records: HashMap<String, Record>,
    version: Option<u64>,
}

impl ReferenceModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a delta. Returns false, changing nothing, if it is stale.
    pub fn apply(&mut self, delta: &Delta<TestEntity>) -> bool {
        if matches!(self.version, Some(current) if delta.next_version < current) {
            return false;
        }
        for entity in &delta.upserts {
            self.records
                .insert(entity.id.clone(), Record::Live(entity.clone()));
        }
        for id in &delta.deleted_ids {
            self.records
                .insert(id.clone(), Record::Deleted(delta.next_version));
        }
        self.version = Some(delta.next_version);
        true
    }

    /// The version of the last accepted delta.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Live entity for `id`.
    pub fn get(&self, id: &str) -> Option<&TestEntity> {
        match self.records.get(id) {
            Some(Record::Live(entity)) => Some(entity),
            _ => None,
        }
    }

    /// State of `id`.
    pub fn entry_state(&self, id: &str) -> EntryState<u64> {
        match self.records.get(id) {
            Some(Record::Live(entity)) => EntryState::Live(entity.version),
            Some(Record::Deleted(version)) => EntryState::Tombstoned(*version),
            None => EntryState::Unknown,
        }
    }

    /// Every id the model has seen.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| matches!(r, Record::Live(_)))
            .count()
    }

    /// Number of tombstones.
    pub fn tombstone_count(&self) -> usize {
        self.records.len() - self.live_count()
    }

    /// Changes at or above `since`, sorted like the cache sorts them.
    pub fn changes_since(&self, since: u64) -> ChangeSet<TestEntity> {
        let mut upserts: Vec<TestEntity> = self
            .records
            .values()
            .filter_map(|r| match r {
                Record::Live(entity) if entity.version >= since => Some(entity.clone()),
                _ => None,
            })
            .collect();
        upserts.sort_by(|a, b| (a.version, &a.id).cmp(&(b.version, &b.id)));

        let mut deleted: Vec<(u64, String)> = self
            .records
            .iter()
            .filter_map(|(id, r)| match r {
                Record::Deleted(version) if *version >= since => Some((*version, id.clone())),
                _ => None,
            })
            .collect();
        deleted.sort();

        ChangeSet {
            upserts,
            deleted_ids: deleted.into_iter().map(|(_, id)| id).collect(),
            next_version: self.version,
        }
    }
}
