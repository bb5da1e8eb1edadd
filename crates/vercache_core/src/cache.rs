//! The versioned cache engine.
//!
//! A cache is opened as a pair of handles: one [`CacheWriter`], the only
//! handle able to apply deltas, and a cloneable [`CacheReader`] for any number
//! of concurrent readers.
//!
//! # Consistency
//!
//! The live map, the tombstone map, both version indices and the current
//! version sit behind a single reader/writer lock. A delta is applied while
//! holding the write lock and every read holds the read lock for its whole
//! duration, so readers observe each delta either entirely or not at all.
//! Commits are linearizable.

use crate::change_feed::{ChangeFeed, CommitEvent};
use crate::config::CacheConfig;
use crate::delta::{ChangeSet, Delta};
use crate::entity::{EntityKey, Versioned};
use crate::error::{CacheError, CacheResult};
use crate::stats::{CacheStats, StatsSnapshot};
use crate::version_index::VersionIndex;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Where an id currently stands in a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryState<V> {
    /// Never seen.
    Unknown,
    /// Live, stored under the entity's own version.
    Live(V),
    /// Deleted as of the given version and not re-added since.
    Tombstoned(V),
}

impl<V> EntryState<V> {
    /// Returns true for a live entry.
    pub fn is_live(&self) -> bool {
        matches!(self, EntryState::Live(_))
    }

    /// Returns true for a tombstoned entry.
    pub fn is_tombstoned(&self) -> bool {
        matches!(self, EntryState::Tombstoned(_))
    }

    /// The version of the entry, if known.
    pub fn version(&self) -> Option<&V> {
        match self {
            EntryState::Unknown => None,
            EntryState::Live(v) | EntryState::Tombstoned(v) => Some(v),
        }
    }
}

/// Structural summary of a cache, with any broken invariants spelled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport<V> {
    /// Live entity count.
    pub live: usize,
    /// Tombstone count.
    pub tombstones: usize,
    /// Distinct versions in the live index.
    pub live_versions: usize,
    /// Distinct versions in the tombstone index.
    pub tombstone_versions: usize,
    /// Lowest version still holding a tombstone.
    pub oldest_tombstone: Option<V>,
    /// Human-readable descriptions of violated invariants. Empty when sound.
    pub violations: Vec<String>,
}

impl<V> IntegrityReport<V> {
    /// Returns true if no invariant is violated.
    pub fn is_sound(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Everything guarded by the cache lock.
struct CacheState<E: Versioned> {
    live_by_id: HashMap<EntityKey, E>,
    live_by_version: VersionIndex<E::Version>,
    tombstone_by_id: HashMap<EntityKey, E::Version>,
    tombstone_by_version: VersionIndex<E::Version>,
    current_version: Option<E::Version>,
}

impl<E: Versioned> CacheState<E> {
    fn new(initial_version: Option<E::Version>) -> Self {
        Self {
            live_by_id: HashMap::new(),
            live_by_version: VersionIndex::new(),
            tombstone_by_id: HashMap::new(),
            tombstone_by_version: VersionIndex::new(),
            current_version: initial_version,
        }
    }

    fn check_version(&self, next: &E::Version) -> CacheResult<()> {
        match &self.current_version {
            Some(current) if next < current => Err(CacheError::out_of_order(next, current)),
            _ => Ok(()),
        }
    }

    /// Drops whatever live or tombstone record exists for `id`.
    fn remove_record(&mut self, id: &str) {
        if let Some(old) = self.live_by_id.remove(id) {
            self.live_by_version.remove(old.data_version(), id);
            return;
        }
        if let Some(old_version) = self.tombstone_by_id.remove(id) {
            self.tombstone_by_version.remove(&old_version, id);
        }
    }

    fn upsert(&mut self, entity: E) {
        let id = entity.id().to_owned();
        self.remove_record(&id);
        self.live_by_version
            .insert(entity.data_version().clone(), id.clone());
        self.live_by_id.insert(id, entity);
    }

    fn tombstone(&mut self, id: EntityKey, version: E::Version) {
        self.remove_record(&id);
        self.tombstone_by_version.insert(version.clone(), id.clone());
        self.tombstone_by_id.insert(id, version);
    }

    fn entry_state(&self, id: &str) -> EntryState<E::Version> {
        if let Some(entity) = self.live_by_id.get(id) {
            return EntryState::Live(entity.data_version().clone());
        }
        match self.tombstone_by_id.get(id) {
            Some(version) => EntryState::Tombstoned(version.clone()),
            None => EntryState::Unknown,
        }
    }

    fn integrity_report(&self) -> IntegrityReport<E::Version> {
        let mut violations = Vec::new();

        for (id, entity) in &self.live_by_id {
            if self.tombstone_by_id.contains_key(id) {
                violations.push(format!("{id} is both live and tombstoned"));
            }
            if !self.live_by_version.contains(entity.data_version(), id) {
                violations.push(format!(
                    "{id} missing from live index at {:?}",
                    entity.data_version()
                ));
            }
        }
        for (id, version) in &self.tombstone_by_id {
            if !self.tombstone_by_version.contains(version, id) {
                violations.push(format!("{id} missing from tombstone index at {version:?}"));
            }
        }
        if self.live_by_version.len() != self.live_by_id.len() {
            violations.push(format!(
                "live index holds {} ids for {} entities",
                self.live_by_version.len(),
                self.live_by_id.len()
            ));
        }
        if self.tombstone_by_version.len() != self.tombstone_by_id.len() {
            violations.push(format!(
                "tombstone index holds {} ids for {} tombstones",
                self.tombstone_by_version.len(),
                self.tombstone_by_id.len()
            ));
        }
        if let Some(current) = &self.current_version {
            for (version, id) in self
                .live_by_version
                .iter()
                .chain(self.tombstone_by_version.iter())
            {
                if version > current {
                    violations.push(format!(
                        "{id} recorded at {version:?}, above current version {current:?}"
                    ));
                }
            }
        }

        IntegrityReport {
            live: self.live_by_id.len(),
            tombstones: self.tombstone_by_id.len(),
            live_versions: self.live_by_version.bucket_count(),
            tombstone_versions: self.tombstone_by_version.bucket_count(),
            oldest_tombstone: self.tombstone_by_version.min_version().cloned(),
            violations,
        }
    }
}

impl<E: Versioned + Clone> CacheState<E> {
    fn changes_since(&self, version: &E::Version) -> ChangeSet<E> {
        let upserts = self
            .live_by_version
            .since(version)
            .filter_map(|(_, id)| self.live_by_id.get(id).cloned())
            .collect();
        let deleted_ids = self
            .tombstone_by_version
            .since(version)
            .map(|(_, id)| id.clone())
            .collect();

        ChangeSet {
            upserts,
            deleted_ids,
            next_version: self.current_version.clone(),
        }
    }

    fn snapshot(&self) -> ChangeSet<E> {
        let upserts = self
            .live_by_version
            .iter()
            .filter_map(|(_, id)| self.live_by_id.get(id).cloned())
            .collect();
        let deleted_ids = self
            .tombstone_by_version
            .iter()
            .map(|(_, id)| id.clone())
            .collect();

        ChangeSet {
            upserts,
            deleted_ids,
            next_version: self.current_version.clone(),
        }
    }
}

/// A versioned, incrementally synchronizable cache.
///
/// Not used directly: [`VersionedCache::open`] hands back the writer and
/// reader handles that share it.
pub struct VersionedCache<E: Versioned> {
    name: String,
    state: RwLock<CacheState<E>>,
    stats: CacheStats,
    feed: ChangeFeed<E::Version>,
}

impl<E: Versioned> VersionedCache<E> {
    /// Opens an empty cache with default configuration.
    ///
    /// Returns the only writer handle together with a reader handle.
    pub fn open() -> (CacheWriter<E>, CacheReader<E>) {
        Self::open_with_config(CacheConfig::default())
    }

    /// Opens an empty cache with the given configuration.
    pub fn open_with_config(config: CacheConfig<E::Version>) -> (CacheWriter<E>, CacheReader<E>) {
        debug!(
            cache = %config.name,
            initial_version = ?config.initial_version,
            "opening cache"
        );
        let cache = Arc::new(Self {
            name: config.name,
            state: RwLock::new(CacheState::new(config.initial_version)),
            stats: CacheStats::new(),
            feed: ChangeFeed::new(),
        });
        let reader = CacheReader {
            cache: Arc::clone(&cache),
        };
        (CacheWriter { cache }, reader)
    }
}

/// The single handle allowed to mutate a cache.
///
/// There is exactly one writer per cache and it is not `Clone`; applying a
/// delta takes `&mut self`. Move it to whichever thread owns the write path.
pub struct CacheWriter<E: Versioned> {
    cache: Arc<VersionedCache<E>>,
}

impl<E: Versioned> CacheWriter<E> {
    /// Applies a delta.
    ///
    /// Upserts are applied in order, each replacing any prior live or
    /// tombstone record for its id and indexed under the entity's own
    /// version. Deleted ids are then tombstoned at `delta.next_version`.
    /// Finally the cache moves to `delta.next_version`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::OutOfOrderVersion`] if `delta.next_version` is
    /// lower than the current version. Nothing is changed in that case.
    /// An equal version is accepted.
    ///
    /// Upserts carrying a version above `delta.next_version` break the
    /// producer contract. They are still applied, and only
    /// [`CacheReader::integrity_report`] flags them.
    pub fn apply_delta(&mut self, delta: Delta<E>) -> CacheResult<()> {
        let Delta {
            upserts,
            deleted_ids,
            next_version,
        } = delta;
        let cache = &*self.cache;

        let mut state = cache.state.write();
        if let Err(err) = state.check_version(&next_version) {
            drop(state);
            cache.stats.record_rejection();
            warn!(cache = %cache.name, error = %err, "rejected delta");
            return Err(err);
        }

        let notify = cache.feed.has_subscribers();
        let upsert_count = upserts.len();
        let mut upserted_ids = Vec::new();
        for entity in upserts {
            if notify {
                upserted_ids.push(entity.id().to_owned());
            }
            state.upsert(entity);
        }
        for id in &deleted_ids {
            state.tombstone(id.clone(), next_version.clone());
        }
        state.current_version = Some(next_version.clone());
        let (live, tombstones) = (state.live_by_id.len(), state.tombstone_by_id.len());
        drop(state);

        cache.stats.record_commit(upsert_count, deleted_ids.len());
        debug!(
            cache = %cache.name,
            version = ?next_version,
            upserts = upsert_count,
            deletes = deleted_ids.len(),
            live,
            tombstones,
            "applied delta"
        );

        if notify {
            cache.feed.emit(CommitEvent {
                version: next_version,
                upserted_ids,
                deleted_ids,
            });
        }
        Ok(())
    }

    /// Returns a new reader handle for this cache.
    pub fn reader(&self) -> CacheReader<E> {
        CacheReader {
            cache: Arc::clone(&self.cache),
        }
    }

    /// The last committed version.
    pub fn current_version(&self) -> Option<E::Version> {
        self.cache.state.read().current_version.clone()
    }
}

impl<E: Versioned> std::fmt::Debug for CacheWriter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWriter")
            .field("cache", &self.cache.name)
            .field("current_version", &self.current_version())
            .finish_non_exhaustive()
    }
}

/// A read handle on a cache. Cheap to clone and safe to share across threads.
pub struct CacheReader<E: Versioned> {
    cache: Arc<VersionedCache<E>>,
}

impl<E: Versioned> Clone for CacheReader<E> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<E: Versioned + Clone> CacheReader<E> {
    /// Returns everything that changed at or after `version`.
    ///
    /// The result holds every live entity whose version is `>= version`,
    /// every tombstoned id whose deletion version is `>= version`, and the
    /// current version to resume from. A version above anything known gives
    /// empty lists. Cost is proportional to the number of matching versions
    /// and ids, not to the size of the cache.
    pub fn query_changes_since(&self, version: &E::Version) -> ChangeSet<E> {
        self.cache.stats.record_query();
        let changes = self.cache.state.read().changes_since(version);
        trace!(
            cache = %self.cache.name,
            since = ?version,
            upserts = changes.upserts.len(),
            deletes = changes.deleted_ids.len(),
            "served changes"
        );
        changes
    }

    /// Returns the live entity for `id`, or `None` if deleted or never seen.
    pub fn get_by_id(&self, id: &str) -> Option<E> {
        self.cache.stats.record_lookup();
        self.cache.state.read().live_by_id.get(id).cloned()
    }

    /// Returns every live entity and tombstone, as a full change set.
    pub fn snapshot(&self) -> ChangeSet<E> {
        self.cache.state.read().snapshot()
    }
}

impl<E: Versioned> CacheReader<E> {
    /// The last committed version, or `None` if nothing was ever applied.
    pub fn current_version(&self) -> Option<E::Version> {
        self.cache.state.read().current_version.clone()
    }

    /// Where `id` currently stands.
    pub fn entry_state(&self, id: &str) -> EntryState<E::Version> {
        self.cache.state.read().entry_state(id)
    }

    /// Returns true if `id` is live.
    pub fn contains(&self, id: &str) -> bool {
        self.cache.state.read().live_by_id.contains_key(id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.cache.state.read().live_by_id.len()
    }

    /// Returns true if there are no live entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tombstones.
    pub fn tombstone_count(&self) -> usize {
        self.cache.state.read().tombstone_by_id.len()
    }

    /// Checks the cache's structural invariants.
    pub fn integrity_report(&self) -> IntegrityReport<E::Version> {
        self.cache.state.read().integrity_report()
    }

    /// Subscribes to commit events.
    pub fn subscribe(&self) -> Receiver<CommitEvent<E::Version>> {
        self.cache.feed.subscribe()
    }

    /// Number of live commit subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.cache.feed.subscriber_count()
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.cache.stats.snapshot()
    }

    /// The configured cache name.
    pub fn name(&self) -> &str {
        &self.cache.name
    }
}

impl<E: Versioned> std::fmt::Debug for CacheReader<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheReader")
            .field("cache", &self.cache.name)
            .field("current_version", &self.current_version())
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}
