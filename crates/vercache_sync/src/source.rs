//! The producer side of a sync: anything that can hand out deltas.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use vercache_core::{CacheReader, Delta, Versioned};

/// A producer of deltas.
///
/// `fetch_updates(since)` returns the changes after `since` together with the
/// version to ask from next time. `since` is `None` on the first fetch, when
/// the cache has no version yet.
///
/// This trait abstracts the transport, allowing for different implementations
/// (HTTP, RPC, an upstream cache, a scripted mock for testing, etc.).
pub trait VersionedSource<E: Versioned>: Send + Sync {
    /// Fetches the changes since the given version.
    fn fetch_updates(&self, since: Option<&E::Version>) -> SyncResult<Delta<E>>;
}

/// Serves a downstream cache from an upstream one.
///
/// The changes since `since` are read with
/// [`CacheReader::query_changes_since`]; a first fetch returns a full
/// snapshot. Fails with [`SyncError::NotReady`] while the upstream has no
/// version.
impl<E> VersionedSource<E> for CacheReader<E>
where
    E: Versioned + Clone + Send + Sync,
{
    fn fetch_updates(&self, since: Option<&E::Version>) -> SyncResult<Delta<E>> {
        let changes = match since {
            Some(version) => self.query_changes_since(version),
            None => self.snapshot(),
        };
        changes
            .into_delta()
            .ok_or_else(|| SyncError::NotReady(format!("cache {} has no version yet", self.name())))
    }
}

/// Adapts a closure into a [`VersionedSource`].
pub struct FnSource<F> {
    fetch: F,
}

/// Wraps `fetch` as a source.
///
/// ```rust,ignore
/// let source = source_fn(|since: Option<&u64>| {
///     Ok(Delta::new(since.copied().unwrap_or(0) + 1))
/// });
/// ```
pub fn source_fn<F>(fetch: F) -> FnSource<F> {
    FnSource { fetch }
}

impl<E, F> VersionedSource<E> for FnSource<F>
where
    E: Versioned,
    F: Fn(Option<&E::Version>) -> SyncResult<Delta<E>> + Send + Sync,
{
    fn fetch_updates(&self, since: Option<&E::Version>) -> SyncResult<Delta<E>> {
        (self.fetch)(since)
    }
}

/// A scripted source for testing.
///
/// Responses are returned in the order they were pushed. Every requested
/// baseline is recorded.
pub struct MockSource<E: Versioned> {
    responses: Mutex<VecDeque<SyncResult<Delta<E>>>>,
    requests: Mutex<Vec<Option<E::Version>>>,
}

impl<E: Versioned> MockSource<E> {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a delta to return.
    pub fn push_delta(&self, delta: Delta<E>) {
        self.responses.lock().push_back(Ok(delta));
    }

    /// Queues an error to return.
    pub fn push_error(&self, error: SyncError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Baselines the source was asked for, oldest first.
    pub fn requests(&self) -> Vec<Option<E::Version>> {
        self.requests.lock().clone()
    }

    /// Number of scripted responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

impl<E: Versioned> Default for MockSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> VersionedSource<E> for MockSource<E>
where
    E: Versioned + Send + Sync,
{
    fn fetch_updates(&self, since: Option<&E::Version>) -> SyncResult<Delta<E>> {
        self.requests.lock().push(since.cloned());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::source_fatal("no mock response scripted")))
    }
}
