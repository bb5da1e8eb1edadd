//! CBOR encoding for deltas on the wire.
//!
//! A delta is encoded as a map with the keys `upserts`, `deletedIds` and
//! `nextVersion`. Decoding accepts a map with either list missing.

use crate::error::{SyncError, SyncResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use vercache_core::{Delta, Versioned};

/// Encodes a delta to CBOR bytes.
pub fn encode_delta<E>(delta: &Delta<E>) -> SyncResult<Vec<u8>>
where
    E: Versioned + Serialize,
    E::Version: Serialize,
{
    let mut buf = Vec::new();
    ciborium::into_writer(delta, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    Ok(buf)
}

/// Decodes a delta from CBOR bytes.
pub fn decode_delta<E>(bytes: &[u8]) -> SyncResult<Delta<E>>
where
    E: Versioned + DeserializeOwned,
    E::Version: DeserializeOwned,
{
    ciborium::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::value::Value;
    use vercache_testkit::{entity, TestEntity};

    #[test]
    fn delta_survives_the_wire() {
        let delta = Delta::new(7)
            .with_upsert(entity("1", "Alice", 7))
            .with_upsert(entity("2", "Bob", 3))
            .with_deleted("9");

        let bytes = encode_delta(&delta).unwrap();
        let decoded: Delta<TestEntity> = decode_delta(&bytes).unwrap();
        assert_eq!(decoded, delta);
    }

    #[test]
    fn missing_lists_decode_empty() {
        let value = Value::Map(vec![(
            Value::Text("nextVersion".into()),
            Value::Integer(4.into()),
        )]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();

        let decoded: Delta<TestEntity> = decode_delta(&bytes).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.next_version, 4);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        let err = decode_delta::<TestEntity>(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, SyncError::Codec(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_version_is_rejected() {
        let value = Value::Map(vec![(Value::Text("upserts".into()), Value::Array(vec![]))]);
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();

        assert!(decode_delta::<TestEntity>(&bytes).is_err());
    }
}
