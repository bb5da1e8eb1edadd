//! Concurrent stress tests for the cache.
//!
//! One writer commits a stream of deltas while reader threads snapshot the
//! cache in a loop. Every delta rewrites the same set of ids at its own
//! version, so a consistent snapshot has every live entity at the snapshot's
//! version and accounts for every id exactly once. Anything else is a torn
//! read.

use crate::fixtures::{entity, TestEntity};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use vercache_core::{CacheReader, Delta, VersionedCache};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Deltas committed by the writer.
    pub deltas_applied: usize,
    /// Snapshots taken by readers.
    pub reads: usize,
    /// Snapshots that showed part of a delta.
    pub torn_reads: usize,
    /// Times a reader saw the version go backwards.
    pub version_regressions: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns true if no reader saw an inconsistent cache.
    pub fn is_clean(&self) -> bool {
        self.torn_reads == 0 && self.version_regressions == 0
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Deltas applied: {}", self.deltas_applied);
        println!("Reads: {}", self.reads);
        println!("Torn reads: {}", self.torn_reads);
        println!("Version regressions: {}", self.version_regressions);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of deltas the writer commits.
    pub deltas: usize,
    /// Number of reader threads.
    pub readers: usize,
    /// Number of ids every delta touches.
    pub width: usize,
    /// Every n-th delta deletes all ids instead of upserting them. Zero
    /// disables deletes.
    pub delete_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            deltas: 2_000,
            readers: 4,
            width: 32,
            delete_every: 5,
        }
    }
}

/// Builds delta `n` (version `n`, starting at 1) of a stress stream.
pub fn stress_delta(n: usize, config: &StressConfig) -> Delta<TestEntity> {
    let version = n as u64;
    let ids = (0..config.width).map(|i| format!("s{i}"));
    if config.delete_every > 0 && n % config.delete_every == 0 {
        Delta::new(version).with_deleted_ids(ids)
    } else {
        Delta::new(version).with_upserts(ids.map(|id| entity(id, format!("v{n}"), version)))
    }
}

/// Checks one snapshot. Returns true if it reflects whole deltas only.
fn snapshot_is_consistent(reader: &CacheReader<TestEntity>, width: usize) -> (bool, Option<u64>) {
    let snapshot = reader.snapshot();
    let Some(version) = snapshot.next_version else {
        return (snapshot.is_empty(), None);
    };
    let whole = snapshot.change_count() == width
        && snapshot.upserts.iter().all(|e| e.version == version);
    (whole, Some(version))
}

/// Runs one writer against `config.readers` snapshotting readers.
pub fn stress_concurrent_snapshots(config: &StressConfig) -> StressTestResult {
    let (mut writer, reader) = VersionedCache::<TestEntity>::open();
    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicUsize::new(0));
    let torn = Arc::new(AtomicUsize::new(0));
    let regressions = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.readers)
        .map(|_| {
            let reader = reader.clone();
            let done = Arc::clone(&done);
            let reads = Arc::clone(&reads);
            let torn = Arc::clone(&torn);
            let regressions = Arc::clone(&regressions);
            let width = config.width;

            thread::spawn(move || {
                let mut last_seen = None;
                loop {
                    // Check the flag first so the final state is read at least once.
                    let finished = done.load(Ordering::Acquire);
                    let (whole, version) = snapshot_is_consistent(&reader, width);
                    reads.fetch_add(1, Ordering::Relaxed);
                    if !whole {
                        torn.fetch_add(1, Ordering::Relaxed);
                    }
                    if version < last_seen {
                        regressions.fetch_add(1, Ordering::Relaxed);
                    }
                    last_seen = version;
                    if finished {
                        break;
                    }
                }
            })
        })
        .collect();

    let mut applied = 0usize;
    for n in 1..=config.deltas {
        if writer.apply_delta(stress_delta(n, config)).is_ok() {
            applied += 1;
        }
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult {
        deltas_applied: applied,
        reads: reads.load(Ordering::Relaxed),
        torn_reads: torn.load(Ordering::Relaxed),
        version_regressions: regressions.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

/// Runs the writer alone, applying `config.deltas` deltas.
pub fn stress_sequential_writes(config: &StressConfig) -> StressTestResult {
    let (mut writer, _reader) = VersionedCache::<TestEntity>::open();
    let start = Instant::now();

    let mut applied = 0usize;
    for n in 1..=config.deltas {
        if writer.apply_delta(stress_delta(n, config)).is_ok() {
            applied += 1;
        }
    }

    StressTestResult {
        deltas_applied: applied,
        reads: 0,
        torn_reads: 0,
        version_regressions: 0,
        duration: start.elapsed(),
    }
}
