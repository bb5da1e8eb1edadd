//! Replay command implementation.
//!
//! Applies a JSON array of person deltas to a fresh cache, in file order, and
//! prints what changed since a given version.

use crate::person::Person;
use serde::Serialize;
use std::path::Path;
use tracing::warn;
use vercache_core::{ChangeSet, Delta, VersionedCache};

/// Result of replaying a delta file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// Deltas applied.
    pub applied: usize,
    /// Indices of deltas rejected as out of order.
    pub rejected: Vec<usize>,
    /// Changes since the requested version, or everything.
    pub changes: ChangeSet<Person>,
}

/// Replays the deltas in `path`.
///
/// Out-of-order deltas are skipped and reported, unless `strict` is set, in
/// which case the first one aborts the replay.
pub fn replay(
    path: &Path,
    since: Option<u64>,
    strict: bool,
) -> Result<ReplayReport, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let deltas: Vec<Delta<Person>> = serde_json::from_str(&content)?;

    let (mut writer, reader) = VersionedCache::<Person>::open();
    let mut applied = 0;
    let mut rejected = Vec::new();

    for (index, delta) in deltas.into_iter().enumerate() {
        match writer.apply_delta(delta) {
            Ok(()) => applied += 1,
            Err(e) if strict => {
                return Err(format!("delta {index}: {e}").into());
            }
            Err(e) => {
                warn!(index, error = %e, "skipping delta");
                rejected.push(index);
            }
        }
    }

    let changes = match since {
        Some(version) => reader.query_changes_since(&version),
        None => reader.snapshot(),
    };

    Ok(ReplayReport {
        applied,
        rejected,
        changes,
    })
}

/// Runs the replay command.
pub fn run(
    path: &Path,
    since: Option<u64>,
    strict: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = replay(path, since, strict)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Replayed {}", path.display());
            println!("  Applied:  {}", report.applied);
            if !report.rejected.is_empty() {
                println!("  Rejected: {:?}", report.rejected);
            }
            match report.changes.next_version {
                Some(v) => println!("  Version:  {}", v),
                None => println!("  Version:  (none)"),
            }
            println!();
            println!("Upserts ({}):", report.changes.upserts.len());
            for person in &report.changes.upserts {
                println!("  {:>6}  {:<20} v{}", person.id, person.name, person.data_version);
            }
            println!("Deleted ({}):", report.changes.deleted_ids.len());
            for id in &report.changes.deleted_ids {
                println!("  {:>6}", id);
            }
        }
    }

    Ok(())
}
