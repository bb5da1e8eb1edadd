//! Test entities and cache helpers.

use serde::{Deserialize, Serialize};
use vercache_core::{CacheReader, CacheWriter, Delta, Versioned, VersionedCache};

/// A minimal versioned entity for tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestEntity {
    /// Entity id.
    pub id: String,
    /// Arbitrary payload.
    pub value: String,
    /// Data version.
    pub version: u64,
}

impl Versioned for TestEntity {
    type Version = u64;

    fn id(&self) -> &str {
        &self.id
    }

    fn data_version(&self) -> &u64 {
        &self.version
    }
}

/// Creates a test entity.
pub fn entity(id: impl Into<String>, value: impl Into<String>, version: u64) -> TestEntity {
    TestEntity {
        id: id.into(),
        value: value.into(),
        version,
    }
}

/// A delta that upserts `entities` and moves to `next_version`.
pub fn upsert_delta(
    next_version: u64,
    entities: impl IntoIterator<Item = TestEntity>,
) -> Delta<TestEntity> {
    Delta::new(next_version).with_upserts(entities)
}

/// A delta that deletes `ids` at `next_version`.
pub fn delete_delta<I, S>(next_version: u64, ids: I) -> Delta<TestEntity>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Delta::new(next_version).with_deleted_ids(ids)
}

/// Opens an empty cache of test entities.
pub fn open_cache() -> (CacheWriter<TestEntity>, CacheReader<TestEntity>) {
    VersionedCache::open()
}

/// Opens a cache holding `count` entities.
///
/// Entity `i` has id `e{i}` and version `i + 1`, committed one delta per
/// entity, so the cache ends at version `count`.
pub fn populated_cache(count: usize) -> (CacheWriter<TestEntity>, CacheReader<TestEntity>) {
    let (mut writer, reader) = open_cache();
    for i in 0..count {
        let version = i as u64 + 1;
        writer
            .apply_delta(upsert_delta(
                version,
                [entity(format!("e{i}"), format!("value-{i}"), version)],
            ))
            .expect("versions increase");
    }
    (writer, reader)
}

/// Parses a delta from its JSON wire form.
///
/// ```rust
/// use vercache_testkit::delta_from_json;
///
/// let delta = delta_from_json(r#"{"nextVersion": 3, "deletedIds": ["a"]}"#);
/// assert_eq!(delta.next_version, 3);
/// assert!(delta.upserts.is_empty());
/// ```
pub fn delta_from_json(json: &str) -> Delta<TestEntity> {
    serde_json::from_str(json).expect("valid delta JSON")
}

/// Canned change histories.
pub mod scenarios {
    use super::*;

    /// A person is added, renamed twice, then deleted.
    ///
    /// Versions 10, 11, 12 and 13; the final state has `1` tombstoned at 13.
    pub fn person_lifecycle() -> Vec<Delta<TestEntity>> {
        vec![
            upsert_delta(10, [entity("1", "Alice", 10)]),
            upsert_delta(11, [entity("1", "Alicia", 11)]),
            upsert_delta(12, [entity("1", "Ali", 12)]),
            delete_delta(13, ["1"]),
        ]
    }

    /// Several ids churn across a handful of versions.
    ///
    /// Final live set: `b` at 4, `c` at 5 and `a` at 6. Final tombstones:
    /// `d` at 5.
    pub fn churn() -> Vec<Delta<TestEntity>> {
        vec![
            upsert_delta(2, [entity("a", "a1", 1), entity("b", "b1", 2)]),
            upsert_delta(3, [entity("c", "c1", 3), entity("d", "d1", 3)]),
            delete_delta(4, ["a"]).with_upsert(entity("b", "b2", 4)),
            delete_delta(5, ["d"]).with_upsert(entity("c", "c2", 5)),
            upsert_delta(6, [entity("a", "a2", 6)]),
        ]
    }
}
