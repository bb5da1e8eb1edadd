//! Benchmark utilities for VerCache.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use vercache_core::Delta;
use vercache_testkit::{entity, TestEntity};

/// Generates a delta at `version` upserting `count` entities picked at
/// random from `0..key_space`, each stamped with `version`.
pub fn random_upserts(version: u64, count: usize, key_space: usize) -> Delta<TestEntity> {
    let mut rng = rand::thread_rng();
    Delta::new(version).with_upserts((0..count).map(|_| {
        let key = rng.gen_range(0..key_space.max(1));
        entity(format!("e{key}"), "payload", version)
    }))
}

/// Generates a delta at `version` deleting `count` random ids from
/// `0..key_space`.
pub fn random_deletes(version: u64, count: usize, key_space: usize) -> Delta<TestEntity> {
    let mut rng = rand::thread_rng();
    Delta::new(version).with_deleted_ids(
        (0..count).map(|_| format!("e{}", rng.gen_range(0..key_space.max(1)))),
    )
}
