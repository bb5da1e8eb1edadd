//! A simulated person service.
//!
//! The service starts with persons `1000..2000` and a change counter as its
//! version: every add, update and delete bumps the counter and stamps the
//! record with it. Each fetch returns what changed strictly after the given
//! version, then applies one to three random changes, so consecutive polls
//! always have something new to pick up.

use crate::person::Person;
use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use vercache_core::Delta;
use vercache_sync::{SyncResult, VersionedSource};

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Carol", "Dave", "Eve", "Frank", "Grace", "Hank", "Ivy", "Jack",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
];

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 123_456_789;

struct ServiceState {
    rng: StdRng,
    version: u64,
    persons: BTreeMap<u64, Person>,
    deleted: BTreeMap<u64, u64>,
}

impl ServiceState {
    fn random_name(&mut self) -> String {
        let first = FIRST_NAMES[self.rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.gen_range(0..LAST_NAMES.len())];
        format!("{first} {last}")
    }

    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn add_or_update(&mut self, id: u64, name: String) {
        let version = self.next_version();
        trace!(id, %name, version, "person written");
        self.persons
            .insert(id, Person::new(id.to_string(), name, version));
        self.deleted.remove(&id);
    }

    fn delete(&mut self, id: u64) {
        if self.persons.remove(&id).is_some() {
            let version = self.next_version();
            trace!(id, version, "person deleted");
            self.deleted.insert(id, version);
        }
    }

    fn random_existing(&mut self) -> Option<u64> {
        if self.persons.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.persons.len());
        self.persons.keys().nth(index).copied()
    }

    fn simulate_changes(&mut self) {
        let changes = self.rng.gen_range(1..=3);
        for _ in 0..changes {
            match self.rng.gen_range(0..3) {
                0 => {
                    let id = 2000 + self.rng.gen_range(0..1000);
                    let name = self.random_name();
                    self.add_or_update(id, name);
                }
                1 => {
                    if let Some(id) = self.random_existing() {
                        let name = self.random_name();
                        self.add_or_update(id, name);
                    }
                }
                _ => {
                    if let Some(id) = self.random_existing() {
                        self.delete(id);
                    }
                }
            }
        }
    }

    fn changes_after(&self, since: u64) -> Delta<Person> {
        let upserts = self
            .persons
            .values()
            .filter(|p| p.data_version > since)
            .cloned();
        let deleted = self
            .deleted
            .iter()
            .filter(|(_, version)| **version > since)
            .map(|(id, _)| id.to_string());
        Delta::new(self.version)
            .with_upserts(upserts)
            .with_deleted_ids(deleted)
    }
}

/// A seeded, deterministic person producer.
pub struct SimulatedPersonSource {
    state: Mutex<ServiceState>,
}

impl SimulatedPersonSource {
    /// Creates a service seeded with `seed` and its initial thousand persons.
    pub fn new(seed: u64) -> Self {
        let mut state = ServiceState {
            rng: StdRng::seed_from_u64(seed),
            version: 0,
            persons: BTreeMap::new(),
            deleted: BTreeMap::new(),
        };
        for id in 1000..2000 {
            let name = state.random_name();
            state.add_or_update(id, name);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// The service's own version.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Number of persons the service holds.
    pub fn person_count(&self) -> usize {
        self.lock().persons.len()
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock()
    }
}

impl VersionedSource<Person> for SimulatedPersonSource {
    fn fetch_updates(&self, since: Option<&u64>) -> SyncResult<Delta<Person>> {
        let mut state = self.lock();
        let since = since.copied().unwrap_or(0);
        let delta = state.changes_after(since);
        debug!(
            since,
            upserts = delta.upserts.len(),
            deletes = delta.deleted_ids.len(),
            next_version = delta.next_version,
            "served persons"
        );
        state.simulate_changes();
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fetch_returns_everyone() {
        let source = SimulatedPersonSource::new(DEFAULT_SEED);
        let delta = source.fetch_updates(None).unwrap();

        assert_eq!(delta.upserts.len(), 1000);
        assert!(delta.deleted_ids.is_empty());
        assert_eq!(delta.next_version, 1000);
        assert!(source.version() > 1000);
    }

    #[test]
    fn later_fetch_returns_only_new_changes() {
        let source = SimulatedPersonSource::new(7);
        let first = source.fetch_updates(None).unwrap();
        let second = source.fetch_updates(Some(&first.next_version)).unwrap();

        let changes = second.upserts.len() + second.deleted_ids.len();
        assert!((1..=3).contains(&changes));
        assert!(second
            .upserts
            .iter()
            .all(|p| p.data_version > first.next_version));
        assert!(second.next_version > first.next_version);
    }

    #[test]
    fn same_seed_same_history() {
        let a = SimulatedPersonSource::new(42);
        let b = SimulatedPersonSource::new(42);
        let mut since = None;
        for _ in 0..10 {
            let da = a.fetch_updates(since.as_ref()).unwrap();
            let db = b.fetch_updates(since.as_ref()).unwrap();
            assert_eq!(da, db);
            since = Some(da.next_version);
        }
        assert_eq!(a.person_count(), b.person_count());
    }
}
