//! # VerCache Core
//!
//! A versioned, incrementally synchronizable in-memory cache.
//!
//! One writer applies [`Delta`]s (upserts, deletions and the version reached
//! once applied); any number of readers look entities up by id and pull only
//! what changed since a version they already hold.
//!
//! This crate provides:
//! - The [`Versioned`] entity contract
//! - The [`Delta`] batch format and the [`ChangeSet`] query result
//! - The cache engine with its single [`CacheWriter`] and shared [`CacheReader`]s
//! - Commit notifications and counters
//!
//! ## Key Invariants
//!
//! - An id is either live, tombstoned, or unknown; never both live and tombstoned
//! - The cache version never decreases; an older delta is rejected in full
//! - Every commit is all-or-nothing and readers never see half of one
//! - "Changes since V" is a tail scan over version indices, not a full scan
//!
//! ## Example
//!
//! ```rust
//! use vercache_core::{Delta, Versioned, VersionedCache};
//!
//! #[derive(Clone)]
//! struct Person {
//!     id: String,
//!     name: String,
//!     version: u64,
//! }
//!
//! impl Versioned for Person {
//!     type Version = u64;
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn data_version(&self) -> &u64 {
//!         &self.version
//!     }
//! }
//!
//! let (mut writer, reader) = VersionedCache::<Person>::open();
//! let alice = Person { id: "1".into(), name: "Alice".into(), version: 10 };
//! writer.apply_delta(Delta::new(10).with_upsert(alice)).unwrap();
//!
//! let changes = reader.query_changes_since(&0);
//! assert_eq!(changes.upserts.len(), 1);
//! assert_eq!(changes.next_version, Some(10));
//! assert_eq!(reader.get_by_id("1").unwrap().name, "Alice");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod change_feed;
mod config;
mod delta;
mod entity;
mod error;
mod stats;
mod version_index;

pub use cache::{CacheReader, CacheWriter, EntryState, IntegrityReport, VersionedCache};
pub use change_feed::CommitEvent;
pub use config::CacheConfig;
pub use delta::{ChangeSet, Delta};
pub use entity::{compare_versions, same_record, EntityKey, Versioned};
pub use error::{CacheError, CacheResult};
pub use stats::StatsSnapshot;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
