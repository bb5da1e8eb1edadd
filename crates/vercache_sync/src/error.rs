//! Error types for syncing a cache from a producer.

use thiserror::Error;
use vercache_core::CacheError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while pulling deltas into a cache.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The producer failed to return a delta.
    #[error("source error: {message}")]
    Source {
        /// Error message.
        message: String,
        /// Whether the fetch can be retried.
        retryable: bool,
    },

    /// The cache rejected the fetched delta.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// A delta could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The producer has no version to offer yet.
    #[error("source not ready: {0}")]
    NotReady(String),
}

impl SyncError {
    /// Creates a retryable source error.
    pub fn source_retryable(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable source error.
    pub fn source_fatal(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// A version regression is never retryable: refetching from the same
    /// baseline yields the same stale delta.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Source { retryable, .. } => *retryable,
            SyncError::NotReady(_) => true,
            SyncError::Cache(_) | SyncError::Codec(_) => false,
        }
    }
}
