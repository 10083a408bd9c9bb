//! Caregiver alert codec.
//!
//! The payload is the JSON form of [`Caregiver`]. Unknown fields are ignored
//! so a newer companion build can add fields without breaking older peers.

use crate::error::{LinkError, LinkResult};
use fallguard_types::Caregiver;

/// Maximum accepted payload size (64 KB).
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Serializes a caregiver record for transport.
pub fn encode(caregiver: &Caregiver) -> LinkResult<Vec<u8>> {
    serde_json::to_vec(caregiver).map_err(LinkError::Encode)
}

/// Deserializes a caregiver record.
///
/// Fails on missing fields, wrong types, truncated input and records that
/// violate the caregiver invariants. Never yields a partial record.
pub fn decode(bytes: &[u8]) -> LinkResult<Caregiver> {
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(LinkError::Decode(format!(
            "payload too large: {} bytes",
            bytes.len()
        )));
    }

    serde_json::from_slice(bytes)
        .map_err(|e| LinkError::Decode(format!("JSON decode error: {e}")))
}
