//! Simulate command implementation.
//!
//! Runs a syncer against the simulated person service while reader threads
//! follow the cache: each reader keeps its own replica current with
//! incremental queries, woken by the commit feed. At the end every replica is
//! compared with the cache.

use crate::person::Person;
use crate::simulator::SimulatedPersonSource;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use vercache_core::{CacheConfig, CacheReader, VersionedCache};
use vercache_sync::{RetryConfig, SyncConfig, Syncer};

/// Summary of a simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    /// Seed of the simulated service.
    pub seed: u64,
    /// Sync cycles run.
    pub cycles: u64,
    /// Final cache version.
    pub version: Option<u64>,
    /// Live persons in the cache.
    pub live: usize,
    /// Tombstones in the cache.
    pub tombstones: usize,
    /// Persons the service holds.
    pub service_persons: usize,
    /// Upserts pulled over all cycles.
    pub upserts_pulled: u64,
    /// Deletions pulled over all cycles.
    pub deletes_pulled: u64,
    /// Changes-since queries served to readers.
    pub queries: u64,
    /// Readers whose replica matched the cache.
    pub consistent_readers: usize,
    /// Readers started.
    pub readers: usize,
    /// Whether the cache passed its integrity check.
    pub sound: bool,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u128,
}

/// A reader's local copy, maintained from incremental queries.
#[derive(Default)]
struct Replica {
    persons: HashMap<String, Person>,
    version: Option<u64>,
}

impl Replica {
    fn catch_up(&mut self, cache: &CacheReader<Person>) {
        let changes = match self.version {
            Some(version) => cache.query_changes_since(&version),
            None => cache.snapshot(),
        };
        for person in changes.upserts {
            self.persons.insert(person.id.clone(), person);
        }
        for id in &changes.deleted_ids {
            self.persons.remove(id);
        }
        self.version = changes.next_version;
    }

    /// A commit may repeat the last version, so equal versions still pull.
    fn is_behind(&self, committed: u64) -> bool {
        Some(committed) >= self.version
    }

    fn matches(&self, cache: &CacheReader<Person>) -> bool {
        let snapshot = cache.snapshot();
        snapshot.next_version == self.version
            && snapshot.upserts.len() == self.persons.len()
            && snapshot
                .upserts
                .iter()
                .all(|p| self.persons.get(&p.id) == Some(p))
    }
}

fn spawn_reader(
    index: usize,
    cache: CacheReader<Person>,
    done: Arc<AtomicBool>,
) -> thread::JoinHandle<Replica> {
    let events = cache.subscribe();
    thread::spawn(move || {
        let mut replica = Replica::default();
        replica.catch_up(&cache);
        loop {
            match events.recv_timeout(Duration::from_millis(20)) {
                Ok(event) => {
                    if replica.is_behind(event.version) {
                        replica.catch_up(&cache);
                    }
                }
                Err(RecvTimeoutError::Timeout) if !done.load(Ordering::Acquire) => {}
                Err(_) => break,
            }
        }
        replica.catch_up(&cache);
        debug!(
            reader = index,
            version = ?replica.version,
            persons = replica.persons.len(),
            "reader done"
        );
        replica
    })
}

/// Runs the simulation and returns its report.
pub fn simulate(
    seed: u64,
    cycles: u64,
    readers: usize,
) -> Result<SimulationReport, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let (writer, reader) =
        VersionedCache::<Person>::open_with_config(CacheConfig::new().name("persons"));

    let done = Arc::new(AtomicBool::new(false));
    let handles: Vec<_> = (0..readers)
        .map(|i| spawn_reader(i, reader.clone(), Arc::clone(&done)))
        .collect();

    let source = SimulatedPersonSource::new(seed);
    let config = SyncConfig::new("persons").with_retry(RetryConfig::no_retry());
    let mut syncer = Syncer::new(config, source, writer);

    let mut failure = None;
    for cycle in 0..cycles {
        match syncer.sync_with_retry() {
            Ok(result) => debug!(
                cycle,
                version = result.version,
                upserts = result.upserts,
                deletes = result.deletes,
                "cycle done"
            ),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let stats = syncer.stats().clone();
    let service_persons = syncer.source().person_count();
    drop(syncer);
    done.store(true, Ordering::Release);

    let mut consistent_readers = 0;
    for handle in handles {
        let replica = handle.join().map_err(|_| "reader thread panicked")?;
        if replica.matches(&reader) {
            consistent_readers += 1;
        }
    }
    if let Some(e) = failure {
        return Err(e.into());
    }

    let report = SimulationReport {
        seed,
        cycles: stats.cycles_completed,
        version: reader.current_version(),
        live: reader.len(),
        tombstones: reader.tombstone_count(),
        service_persons,
        upserts_pulled: stats.upserts_pulled,
        deletes_pulled: stats.deletes_pulled,
        queries: reader.stats().queries,
        consistent_readers,
        readers,
        sound: reader.integrity_report().is_sound(),
        elapsed_ms: start.elapsed().as_millis(),
    };
    info!(
        version = ?report.version,
        live = report.live,
        tombstones = report.tombstones,
        "simulation complete"
    );
    Ok(report)
}

/// Runs the simulate command.
pub fn run(
    seed: u64,
    cycles: u64,
    readers: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = simulate(seed, cycles, readers)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Simulation (seed {})", report.seed);
            println!("  Cycles:            {}", report.cycles);
            match report.version {
                Some(v) => println!("  Cache version:     {}", v),
                None => println!("  Cache version:     (none)"),
            }
            println!("  Live persons:      {}", report.live);
            println!("  Tombstones:        {}", report.tombstones);
            println!("  Service persons:   {}", report.service_persons);
            println!("  Upserts pulled:    {}", report.upserts_pulled);
            println!("  Deletes pulled:    {}", report.deletes_pulled);
            println!("  Reader queries:    {}", report.queries);
            println!(
                "  Readers in sync:   {}/{}",
                report.consistent_readers, report.readers
            );
            println!(
                "  Integrity:         {}",
                if report.sound { "OK" } else { "FAILED" }
            );
            println!("  Elapsed:           {} ms", report.elapsed_ms);
        }
    }

    if !report.sound || report.consistent_readers != report.readers {
        return Err("simulation ended with an inconsistent cache".into());
    }
    Ok(())
}
