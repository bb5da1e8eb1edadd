//! Pulls deltas from a source into a cache.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::source::VersionedSource;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use vercache_core::{CacheReader, CacheWriter, Versioned};

/// The current state of a syncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No cycle has run yet.
    Idle,
    /// Waiting on the source.
    Fetching,
    /// Applying a fetched delta.
    Applying,
    /// The last cycle completed.
    Synced,
    /// The last cycle failed.
    Error,
    /// Waiting before a retry.
    RetryWait,
}

impl SyncState {
    /// Returns true while a cycle is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Fetching | SyncState::Applying | SyncState::RetryWait
        )
    }
}

/// Statistics about sync cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Cycles that applied a delta.
    pub cycles_completed: u64,
    /// Cycles that ended in an error.
    pub cycles_failed: u64,
    /// Upserts pulled and applied.
    pub upserts_pulled: u64,
    /// Deletions pulled and applied.
    pub deletes_pulled: u64,
    /// Retries performed.
    pub retries: u64,
    /// Time of the last successful cycle.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncCycleResult<V> {
    /// Upserts applied.
    pub upserts: usize,
    /// Deletions applied.
    pub deletes: usize,
    /// Version the cache moved to.
    pub version: V,
    /// Duration of the cycle.
    pub duration: Duration,
}

/// Drives a cache from a [`VersionedSource`].
///
/// The syncer owns the cache's writer, so it is the single writer. Each cycle
/// asks the source for the changes since the cache's current version and
/// applies the answer. How often cycles run is up to the caller.
pub struct Syncer<E: Versioned, S> {
    config: SyncConfig,
    source: S,
    writer: CacheWriter<E>,
    state: SyncState,
    stats: SyncStats,
}

impl<E, S> Syncer<E, S>
where
    E: Versioned,
    S: VersionedSource<E>,
{
    /// Creates a syncer that writes into `writer`.
    pub fn new(config: SyncConfig, source: S, writer: CacheWriter<E>) -> Self {
        Self {
            config,
            source,
            writer,
            state: SyncState::Idle,
            stats: SyncStats::default(),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Gets the current stats.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Returns a reader on the synced cache.
    pub fn reader(&self) -> CacheReader<E> {
        self.writer.reader()
    }

    /// Returns the source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stops syncing and hands the writer back.
    pub fn into_writer(self) -> CacheWriter<E> {
        self.writer
    }

    /// Runs one cycle: fetch since the current version, then apply.
    pub fn sync_once(&mut self) -> SyncResult<SyncCycleResult<E::Version>> {
        let start = Instant::now();
        let baseline = self.writer.current_version();

        self.state = SyncState::Fetching;
        let delta = match self.source.fetch_updates(baseline.as_ref()) {
            Ok(delta) => delta,
            Err(e) => return Err(self.handle_error(e)),
        };

        self.state = SyncState::Applying;
        let upserts = delta.upserts.len();
        let deletes = delta.deleted_ids.len();
        let version = delta.next_version.clone();
        if let Err(e) = self.writer.apply_delta(delta) {
            return Err(self.handle_error(e.into()));
        }

        self.state = SyncState::Synced;
        self.stats.cycles_completed += 1;
        self.stats.upserts_pulled += upserts as u64;
        self.stats.deletes_pulled += deletes as u64;
        self.stats.last_sync_time = Some(Instant::now());
        self.stats.last_error = None;

        let duration = start.elapsed();
        debug!(
            sync = %self.config.name,
            since = ?baseline,
            version = ?version,
            upserts,
            deletes,
            ?duration,
            "sync cycle complete"
        );

        Ok(SyncCycleResult {
            upserts,
            deletes,
            version,
            duration,
        })
    }

    /// Runs one cycle, retrying transient errors with backoff.
    pub fn sync_with_retry(&mut self) -> SyncResult<SyncCycleResult<E::Version>> {
        let retry = self.config.retry.clone();
        let mut last_error = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                self.state = SyncState::RetryWait;
                std::thread::sleep(retry.delay_for_attempt(attempt));
                self.stats.retries += 1;
            }

            match self.sync_once() {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() && attempt + 1 < retry.max_attempts {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SyncError::source_fatal("no sync attempts made")))
    }

    fn handle_error(&mut self, error: SyncError) -> SyncError {
        warn!(
            sync = %self.config.name,
            error = %error,
            retryable = error.is_retryable(),
            "sync cycle failed"
        );
        self.state = SyncState::Error;
        self.stats.cycles_failed += 1;
        self.stats.last_error = Some(error.to_string());
        error
    }
}

impl<E: Versioned, S> std::fmt::Debug for Syncer<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}
