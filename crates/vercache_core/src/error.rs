//! Error types for the cache engine.

use std::fmt::Debug;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors returned by the cache engine.
///
/// Lookups of unknown ids are not errors; they return `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A delta's version is lower than the cache's current version.
    ///
    /// The delta was rejected in full; the cache is unchanged.
    #[error("version {attempted} is older than current cache version {current}")]
    OutOfOrderVersion {
        /// The rejected delta's version (debug-formatted).
        attempted: String,
        /// The cache version at the time of rejection (debug-formatted).
        current: String,
    },
}

impl CacheError {
    /// Creates an out-of-order version error.
    pub fn out_of_order(attempted: &impl Debug, current: &impl Debug) -> Self {
        Self::OutOfOrderVersion {
            attempted: format!("{attempted:?}"),
            current: format!("{current:?}"),
        }
    }

    /// Returns true if this is a version regression.
    pub fn is_out_of_order(&self) -> bool {
        matches!(self, CacheError::OutOfOrderVersion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_order_display() {
        let err = CacheError::out_of_order(&9u64, &10u64);
        assert!(err.is_out_of_order());
        assert_eq!(
            err.to_string(),
            "version 9 is older than current cache version 10"
        );
    }
}
