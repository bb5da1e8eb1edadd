//! # VerCache Testkit
//!
//! Test utilities for VerCache.
//!
//! This crate provides:
//! - A [`TestEntity`] and helpers for building deltas and caches
//! - Canned change histories
//! - Property-based generators of delta histories using proptest
//! - A naive [`ReferenceModel`] to check the cache against
//! - Concurrent stress runs that detect torn reads
//!
//! ## Usage
//!
//! ```rust
//! use vercache_testkit::prelude::*;
//!
//! let (mut writer, reader) = open_cache();
//! for delta in scenarios::person_lifecycle() {
//!     writer.apply_delta(delta).unwrap();
//! }
//! assert!(reader.get_by_id("1").is_none());
//! assert_eq!(reader.query_changes_since(&13).deleted_ids, ["1"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
