//! Cache configuration.

/// Configuration for opening a cache.
#[derive(Debug, Clone)]
pub struct CacheConfig<V> {
    /// Name used in log records, to tell several caches apart.
    pub name: String,

    /// Version the cache starts at.
    ///
    /// `None` means the first delta may carry any version. Setting it makes
    /// the cache reject deltas older than the given baseline from the start.
    pub initial_version: Option<V>,
}

impl<V> Default for CacheConfig<V> {
    fn default() -> Self {
        Self {
            name: "cache".to_string(),
            initial_version: None,
        }
    }
}

impl<V> CacheConfig<V> {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the starting version.
    #[must_use]
    pub fn initial_version(mut self, version: V) -> Self {
        self.initial_version = Some(version);
        self
    }
}
