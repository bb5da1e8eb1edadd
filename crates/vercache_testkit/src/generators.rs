//! Proptest strategies for delta histories.
//!
//! Ids are drawn from a small pool so that histories revisit the same ids:
//! re-adds after deletion, repeated updates and same-delta conflicts all
//! show up within a few steps.

use crate::fixtures::{entity, TestEntity};
use proptest::prelude::*;
use vercache_core::Delta;

/// Size of the id pool used by the generators.
pub const ID_POOL: usize = 8;

/// Id for pool slot `n`.
pub fn pool_id(n: usize) -> String {
    format!("id{n}")
}

/// Strategy for an id from the pool.
pub fn id_strategy() -> impl Strategy<Value = String> {
    (0..ID_POOL).prop_map(pool_id)
}

/// Raw material for one delta, relative to the previous version.
#[derive(Debug, Clone)]
struct Step {
    advance: u64,
    upserts: Vec<(usize, u64, String)>,
    deletes: Vec<usize>,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (
        0u64..3,
        prop::collection::vec((0..ID_POOL, 0u64..3, "[a-z]{1,6}"), 0..4),
        prop::collection::vec(0..ID_POOL, 0..3),
    )
        .prop_map(|(advance, upserts, deletes)| Step {
            advance,
            upserts,
            deletes,
        })
}

/// Strategy for a history of deltas a cache accepts in full.
///
/// Versions never decrease (equal versions occur). Each upserted entity
/// carries a version between the previous delta's `next_version` and its
/// own, inclusive.
pub fn delta_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Delta<TestEntity>>> {
    prop::collection::vec(step_strategy(), 1..max_len.max(2)).prop_map(|steps| {
        let mut version = 0u64;
        steps
            .into_iter()
            .map(|step| {
                let previous = version;
                version += step.advance;
                let mut delta = Delta::new(version);
                for (slot, offset, value) in step.upserts {
                    let entity_version = previous + offset.min(step.advance);
                    delta = delta.with_upsert(entity(pool_id(slot), value, entity_version));
                }
                delta.with_deleted_ids(step.deletes.into_iter().map(pool_id))
            })
            .collect()
    })
}

/// Strategy for a history where some deltas go back in version.
///
/// Each `next_version` is drawn independently, so a cache rejects any delta
/// older than what it already holds. Upserted entity versions are at most
/// their delta's `next_version`.
pub fn unordered_delta_sequence_strategy(
    max_len: usize,
) -> impl Strategy<Value = Vec<Delta<TestEntity>>> {
    let delta = (
        0u64..20,
        prop::collection::vec((0..ID_POOL, 0u64..20, "[a-z]{1,6}"), 0..4),
        prop::collection::vec(0..ID_POOL, 0..3),
    )
        .prop_map(|(next_version, upserts, deletes)| {
            Delta::new(next_version)
                .with_upserts(upserts.into_iter().map(|(slot, version, value)| {
                    entity(pool_id(slot), value, version.min(next_version))
                }))
                .with_deleted_ids(deletes.into_iter().map(pool_id))
        });
    prop::collection::vec(delta, 1..max_len.max(2))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Few cases, for unit tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
