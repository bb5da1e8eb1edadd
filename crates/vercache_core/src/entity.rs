//! The entity contract every cached item satisfies.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

/// Key type for cached entities.
pub type EntityKey = String;

/// An item that can be stored in a [`VersionedCache`](crate::VersionedCache).
///
/// Implementors expose a stable identifier and a version stamp. Two values
/// with the same `id` are the same logical record; the version decides which
/// change bucket the record lives in.
///
/// The only requirement on the version type is a total order. Producers that
/// may emit records without a version should use `Option<T>`: `None` sorts
/// before every `Some`, so an unset version is older than any set one.
///
/// # Example
///
/// ```rust
/// use vercache_core::Versioned;
///
/// struct House {
///     id: String,
///     person_ids: Vec<u64>,
///     version: u32,
/// }
///
/// impl Versioned for House {
///     type Version = u32;
///
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn data_version(&self) -> &u32 {
///         &self.version
///     }
/// }
/// ```
pub trait Versioned {
    /// Version stamp type.
    type Version: Ord + Clone + Debug + Send + Sync + 'static;

    /// Stable identifier, unique within a cache.
    fn id(&self) -> &str;

    /// Version at which this record was produced.
    fn data_version(&self) -> &Self::Version;
}

impl<E: Versioned + ?Sized> Versioned for Arc<E> {
    type Version = E::Version;

    fn id(&self) -> &str {
        (**self).id()
    }

    fn data_version(&self) -> &Self::Version {
        (**self).data_version()
    }
}

/// Orders two entities by their version stamp.
pub fn compare_versions<E: Versioned>(a: &E, b: &E) -> Ordering {
    a.data_version().cmp(b.data_version())
}

/// Returns true if both values describe the same logical record.
pub fn same_record<E: Versioned>(a: &E, b: &E) -> bool {
    a.id() == b.id()
}
