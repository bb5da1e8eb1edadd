//! End-to-end cache scenarios.

use vercache_core::{CacheConfig, Delta, EntryState, VersionedCache};
use vercache_testkit::prelude::*;

#[test]
fn insert_then_delete_then_stale_delete() {
    let (mut writer, reader) = open_cache();

    writer.apply_delta(upsert_delta(10, [entity("1", "A", 10)])).unwrap();
    assert_eq!(reader.current_version(), Some(10));
    assert_eq!(reader.get_by_id("1").unwrap().value, "A");
    let changes = reader.query_changes_since(&0);
    assert_eq!(changes.upserts.len(), 1);
    assert!(changes.deleted_ids.is_empty());

    writer.apply_delta(delete_delta(11, ["1"])).unwrap();
    assert!(reader.get_by_id("1").is_none());
    let changes = reader.query_changes_since(&0);
    assert!(changes.upserts.is_empty());
    assert_eq!(changes.deleted_ids, ["1"]);
    assert_eq!(reader.query_changes_since(&11).deleted_ids, ["1"]);
    let later = reader.query_changes_since(&12);
    assert!(later.is_empty());
    assert_eq!(later.next_version, Some(11));

    let before = reader.snapshot();
    let err = writer.apply_delta(delete_delta(9, ["1"])).unwrap_err();
    assert!(err.is_out_of_order());
    assert_eq!(reader.snapshot(), before);
    assert_eq!(reader.entry_state("1"), EntryState::Tombstoned(11));
}

#[test]
fn stale_upsert_leaves_no_trace() {
    let (mut writer, reader) = open_cache();
    writer.apply_delta(upsert_delta(10, [entity("1", "A", 10)])).unwrap();

    writer
        .apply_delta(upsert_delta(9, [entity("2", "B", 9), entity("1", "Z", 9)]))
        .unwrap_err();

    assert!(reader.get_by_id("2").is_none());
    assert_eq!(reader.get_by_id("1").unwrap().value, "A");
    assert_eq!(reader.query_changes_since(&0).upserts.len(), 1);
    assert_eq!(reader.entry_state("2"), EntryState::Unknown);
}

#[test]
fn delete_wins_within_one_delta() {
    let (mut writer, reader) = open_cache();
    writer
        .apply_delta(delete_delta(7, ["1"]).with_upsert(entity("1", "A", 7)))
        .unwrap();

    assert!(reader.get_by_id("1").is_none());
    assert_eq!(reader.entry_state("1"), EntryState::Tombstoned(7));
    assert!(reader.integrity_report().is_sound());
}

#[test]
fn re_add_after_delete_clears_tombstone() {
    let (mut writer, reader) = open_cache();
    writer.apply_delta(upsert_delta(1, [entity("x", "old", 1)])).unwrap();
    writer.apply_delta(delete_delta(2, ["x"])).unwrap();
    writer.apply_delta(upsert_delta(3, [entity("x", "new", 3)])).unwrap();

    assert_eq!(reader.get_by_id("x").unwrap().value, "new");
    assert_eq!(reader.tombstone_count(), 0);
    assert!(reader.query_changes_since(&0).deleted_ids.is_empty());
    let report = reader.integrity_report();
    assert_eq!(report.oldest_tombstone, None);
    assert!(report.is_sound());
}

#[test]
fn later_upsert_in_same_delta_wins() {
    let (mut writer, reader) = open_cache();
    writer
        .apply_delta(upsert_delta(
            5,
            [entity("a", "first", 4), entity("a", "second", 5)],
        ))
        .unwrap();

    assert_eq!(reader.get_by_id("a").unwrap().value, "second");
    assert!(reader.query_changes_since(&5).upserts.len() == 1);
    assert!(reader.integrity_report().is_sound());
}

#[test]
fn entities_keep_their_own_version() {
    // The delta version is where the cache lands; upserts are indexed by the
    // version they carry.
    let (mut writer, reader) = open_cache();
    writer
        .apply_delta(upsert_delta(20, [entity("old", "o", 3), entity("new", "n", 20)]))
        .unwrap();

    let since_4 = reader.query_changes_since(&4);
    assert_eq!(since_4.upserts.len(), 1);
    assert_eq!(since_4.upserts[0].id, "new");
    assert_eq!(reader.query_changes_since(&3).upserts.len(), 2);
}

#[test]
fn query_before_any_commit() {
    let (_writer, reader) = open_cache();
    let changes = reader.query_changes_since(&0);

    assert!(changes.is_empty());
    assert_eq!(changes.next_version, None);
    assert!(changes.into_delta().is_none());
}

#[test]
fn initial_version_guards_first_delta() {
    let config = CacheConfig::new().name("seeded").initial_version(100);
    let (mut writer, reader) = VersionedCache::<TestEntity>::open_with_config(config);

    assert_eq!(reader.name(), "seeded");
    assert_eq!(reader.current_version(), Some(100));
    assert!(writer.apply_delta(Delta::new(99)).is_err());
    writer.apply_delta(Delta::new(100)).unwrap();
}

#[test]
fn wire_format_round_trips_through_json() {
    let delta = delta_from_json(
        r#"{
            "upserts": [{"id": "1", "value": "Alice", "version": 10}],
            "nextVersion": 10
        }"#,
    );
    let (mut writer, reader) = open_cache();
    writer.apply_delta(delta).unwrap();

    let json = serde_json::to_value(reader.query_changes_since(&0)).unwrap();
    assert_eq!(json["nextVersion"], 10);
    assert_eq!(json["deletedIds"], serde_json::json!([]));
    assert_eq!(json["upserts"][0]["value"], "Alice");
}

#[test]
fn stats_track_reads_and_writes() {
    let (mut writer, reader) = open_cache();
    for delta in scenarios::person_lifecycle() {
        writer.apply_delta(delta).unwrap();
    }
    let _ = writer.apply_delta(Delta::new(1));
    reader.query_changes_since(&0);
    reader.get_by_id("1");

    let stats = reader.stats();
    assert_eq!(stats.deltas_applied, 4);
    assert_eq!(stats.deltas_rejected, 1);
    assert_eq!(stats.upserts_applied, 3);
    assert_eq!(stats.deletes_applied, 1);
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.lookups, 1);
}
