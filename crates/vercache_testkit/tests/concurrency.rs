//! Concurrency tests: one writer, many readers.

use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use vercache_core::{CacheConfig, VersionedCache};
use vercache_sync::{RetryConfig, SyncConfig, Syncer};
use vercache_testkit::prelude::*;

#[test]
fn readers_never_see_partial_deltas() {
    let config = StressConfig {
        deltas: 1_000,
        readers: 4,
        width: 24,
        delete_every: 3,
    };

    let result = stress_concurrent_snapshots(&config);
    assert_eq!(result.deltas_applied, 1_000);
    assert!(result.is_clean(), "{result:?}");
}

#[test]
fn incremental_readers_stay_consistent() {
    // Each reader keeps its own copy current by pulling changes since the
    // last version it saw, then compares against a fresh snapshot.
    let (mut writer, reader) = open_cache();
    let stress = StressConfig {
        width: 8,
        delete_every: 4,
        ..Default::default()
    };
    let start = Arc::new(Barrier::new(3));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let reader = reader.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut seen = None;
                let mut live = std::collections::HashMap::new();
                for _ in 0..500 {
                    let changes = match seen {
                        Some(version) => reader.query_changes_since(&version),
                        None => reader.snapshot(),
                    };
                    for e in changes.upserts {
                        live.insert(e.id.clone(), e);
                    }
                    for id in &changes.deleted_ids {
                        live.remove(id);
                    }
                    seen = changes.next_version;
                }
                (live, seen)
            })
        })
        .collect();

    start.wait();
    for n in 1..=400 {
        writer.apply_delta(stress_delta(n, &stress)).unwrap();
    }

    for handle in handles {
        let (live, seen) = handle.join().unwrap();
        let Some(version) = seen else { continue };
        // A reader that stopped early matches the delta it stopped at.
        let expected = stress_delta(version as usize, &stress);
        if expected.upserts.is_empty() {
            assert!(live.is_empty());
        } else {
            assert_eq!(live.len(), stress.width);
            assert!(live.values().all(|e| e.version == version));
        }
    }
}

#[test]
fn commit_feed_preserves_order() {
    let (mut writer, reader) =
        VersionedCache::<TestEntity>::open_with_config(CacheConfig::new().name("feed"));
    let events = reader.subscribe();

    let consumer = thread::spawn(move || {
        let mut versions = Vec::new();
        loop {
            match events.recv_timeout(Duration::from_secs(5)) {
                Ok(event) => versions.push(event.version),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => panic!("feed stalled"),
            }
        }
        versions
    });

    for n in 1..=200u64 {
        writer
            .apply_delta(upsert_delta(n, [entity(format!("k{}", n % 7), "v", n)]))
            .unwrap();
    }
    drop(writer);
    drop(reader);

    let versions = consumer.join().unwrap();
    assert_eq!(versions, (1..=200).collect::<Vec<_>>());
}

#[test]
fn syncer_thread_feeds_concurrent_readers() {
    let (mut upstream, upstream_reader) = open_cache();
    let (writer, downstream) = open_cache();
    let mut syncer = Syncer::new(
        SyncConfig::new("downstream").with_retry(RetryConfig::no_retry()),
        upstream_reader,
        writer,
    );

    let stress = StressConfig {
        width: 6,
        delete_every: 0,
        ..Default::default()
    };
    upstream.apply_delta(stress_delta(1, &stress)).unwrap();

    let sync_thread = thread::spawn(move || {
        for _ in 0..200 {
            syncer.sync_once().unwrap();
        }
        syncer
    });

    let reader_thread = {
        let downstream = downstream.clone();
        thread::spawn(move || {
            let mut last = None;
            for _ in 0..500 {
                let snapshot = downstream.snapshot();
                assert!(snapshot.next_version >= last);
                if let Some(version) = snapshot.next_version {
                    assert_eq!(snapshot.upserts.len(), 6);
                    assert!(snapshot.upserts.iter().all(|e| e.version == version));
                }
                last = snapshot.next_version;
            }
        })
    };

    for n in 2..=100 {
        upstream.apply_delta(stress_delta(n, &stress)).unwrap();
    }

    reader_thread.join().unwrap();
    let mut syncer = sync_thread.join().unwrap();
    syncer.sync_once().unwrap();

    assert_eq!(downstream.current_version(), Some(100));
    assert!(downstream.integrity_report().is_sound());
}
