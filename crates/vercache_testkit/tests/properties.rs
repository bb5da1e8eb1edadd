//! Property tests: the indexed cache against the reference model.

use proptest::prelude::*;
use vercache_core::{Delta, EntryState, VersionedCache};
use vercache_testkit::prelude::*;

fn check_against_model(
    reader: &vercache_core::CacheReader<TestEntity>,
    model: &ReferenceModel,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(reader.current_version(), model.version());
    prop_assert_eq!(reader.len(), model.live_count());
    prop_assert_eq!(reader.tombstone_count(), model.tombstone_count());

    for id in model.ids() {
        prop_assert_eq!(reader.entry_state(id), model.entry_state(id));
        let cached = reader.get_by_id(id);
        prop_assert_eq!(cached.as_ref(), model.get(id));
    }

    let report = reader.integrity_report();
    prop_assert!(report.is_sound(), "{:?}", report.violations);
    Ok(())
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn cache_matches_model(deltas in delta_sequence_strategy(24)) {
        let (mut writer, reader) = open_cache();
        let mut model = ReferenceModel::new();

        for delta in deltas {
            prop_assert!(model.apply(&delta));
            writer.apply_delta(delta).unwrap();
            check_against_model(&reader, &model)?;
        }
    }

    #[test]
    fn changes_since_matches_full_scan(deltas in delta_sequence_strategy(24), probe in 0u64..60) {
        let (mut writer, reader) = open_cache();
        let mut model = ReferenceModel::new();
        for delta in deltas {
            model.apply(&delta);
            writer.apply_delta(delta).unwrap();
        }

        prop_assert_eq!(reader.query_changes_since(&probe), model.changes_since(probe));
    }

    #[test]
    fn stale_deltas_change_nothing(deltas in unordered_delta_sequence_strategy(24)) {
        let (mut writer, reader) = open_cache();
        let mut model = ReferenceModel::new();
        let mut rejected = 0u64;

        for delta in deltas {
            let before = reader.snapshot();
            let accepted = model.apply(&delta);
            let result = writer.apply_delta(delta);
            prop_assert_eq!(result.is_ok(), accepted);
            if !accepted {
                rejected += 1;
                prop_assert!(result.unwrap_err().is_out_of_order());
                prop_assert_eq!(reader.snapshot(), before);
            }
            check_against_model(&reader, &model)?;
        }

        prop_assert_eq!(reader.stats().deltas_rejected, rejected);
    }

    #[test]
    fn version_never_decreases(deltas in unordered_delta_sequence_strategy(24)) {
        let (mut writer, reader) = open_cache();
        let mut last = None;
        for delta in deltas {
            let _ = writer.apply_delta(delta);
            let current = reader.current_version();
            prop_assert!(current >= last);
            last = current;
        }
    }

    #[test]
    fn ids_are_live_or_tombstoned_never_both(deltas in delta_sequence_strategy(24)) {
        let (mut writer, reader) = open_cache();
        for delta in deltas {
            writer.apply_delta(delta).unwrap();
        }

        let snapshot = reader.snapshot();
        for id in &snapshot.deleted_ids {
            prop_assert!(!snapshot.upserts.iter().any(|e| &e.id == id));
            prop_assert!(matches!(reader.entry_state(id), EntryState::Tombstoned(_)));
        }
        prop_assert_eq!(snapshot.change_count(), reader.len() + reader.tombstone_count());
    }

    #[test]
    fn replaying_changes_converges(deltas in delta_sequence_strategy(24), split in 0usize..24) {
        // A consumer that pulls half way through and again at the end ends
        // up with the same live set as the source.
        let (mut writer, reader) = open_cache();
        let (mut replica, replica_reader) = VersionedCache::<TestEntity>::open();
        let split = split.min(deltas.len());
        let mut pulled_at = None;

        for (i, delta) in deltas.into_iter().enumerate() {
            writer.apply_delta(delta).unwrap();
            if i + 1 == split {
                let changes = reader.snapshot();
                pulled_at = changes.next_version;
                replica.apply_delta(changes.into_delta().unwrap()).unwrap();
            }
        }

        let changes = match pulled_at {
            Some(version) => reader.query_changes_since(&version),
            None => reader.snapshot(),
        };
        replica.apply_delta(changes.into_delta().unwrap()).unwrap();

        let live = |r: &vercache_core::CacheReader<TestEntity>| {
            let mut entities = r.snapshot().upserts;
            entities.sort_by(|a, b| a.id.cmp(&b.id));
            entities
        };
        prop_assert_eq!(live(&replica_reader), live(&reader));
        prop_assert_eq!(replica_reader.current_version(), reader.current_version());
    }
}

#[test]
fn equal_version_delta_is_accepted() {
    let (mut writer, reader) = open_cache();
    writer.apply_delta(upsert_delta(5, [entity("a", "A", 5)])).unwrap();
    writer.apply_delta(Delta::new(5).with_deleted("a")).unwrap();

    assert_eq!(reader.entry_state("a"), EntryState::Tombstoned(5));
}
