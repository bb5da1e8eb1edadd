//! The person record used by the simulator and replay files.

use serde::{Deserialize, Serialize};
use vercache_core::Versioned;

/// A person, versioned by the producer's change counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Numeric id, kept as text.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Version at which this state was written.
    pub data_version: u64,
}

impl Person {
    /// Creates a person.
    pub fn new(id: impl Into<String>, name: impl Into<String>, data_version: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_version,
        }
    }
}

impl Versioned for Person {
    type Version = u64;

    fn id(&self) -> &str {
        &self.id
    }

    fn data_version(&self) -> &u64 {
        &self.data_version
    }
}
