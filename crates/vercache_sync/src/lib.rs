//! # VerCache Sync
//!
//! Pull-based synchronization for VerCache.
//!
//! This crate provides:
//! - The [`VersionedSource`] producer contract
//! - A [`Syncer`] that pulls deltas into a cache it owns the writer of
//! - Retry with exponential backoff
//! - CBOR encoding of deltas for transport
//! - A scripted [`MockSource`] for tests
//!
//! ## Architecture
//!
//! Each sync cycle asks the source for the changes since the cache's current
//! version and applies the answer as one delta:
//! 1. Read the cache version (`None` before the first commit)
//! 2. `fetch_updates(since)` on the source
//! 3. `apply_delta` on the owned writer
//!
//! A [`CacheReader`](vercache_core::CacheReader) is itself a source, so
//! caches can be chained: a downstream cache syncs from an upstream one
//! with the same incremental queries any consumer would use.
//!
//! ## Key Invariants
//!
//! - A syncer is its cache's only writer
//! - A rejected delta leaves the cache untouched and is never retried
//! - Transient source failures are retried up to the configured limit

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod error;
mod source;
mod syncer;

pub use codec::{decode_delta, encode_delta};
pub use config::{RetryConfig, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use source::{source_fn, FnSource, MockSource, VersionedSource};
pub use syncer::{SyncCycleResult, SyncState, SyncStats, Syncer};
