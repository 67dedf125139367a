//! # Binary Snapshot Format
//!
//! ```text
//! [magic "STMA"] [version: u8] [SnapshotHeader (postcard)] [EntityStore (postcard)]
//! ```
//!
//! The header carries member and relationship counts so a reader can reject
//! implausible input before decoding the body. Size, magic and version are
//! all checked before any payload is parsed.
//!
//! Stores are BTreeMap-backed, so save -> load -> save is bit-exact.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_SNAPSHOT_SIZE};
use crate::{EntityStore, StemmaError};
use serde::{Deserialize, Serialize};

/// Magic plus version byte.
const PREFIX_LEN: usize = 5;

/// Counts recorded ahead of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub member_count: u64,
    pub relationship_count: u64,
}

impl SnapshotHeader {
    #[must_use]
    pub fn describe(store: &EntityStore) -> Self {
        Self {
            member_count: store.member_count() as u64,
            relationship_count: store.relationship_count() as u64,
        }
    }

    /// Check the header against a decoded store.
    pub fn verify(&self, store: &EntityStore) -> Result<(), StemmaError> {
        let actual = Self::describe(store);
        if actual.member_count != self.member_count {
            return Err(StemmaError::SerializationError(format!(
                "Member count mismatch: header says {}, found {}",
                self.member_count, actual.member_count
            )));
        }
        if actual.relationship_count != self.relationship_count {
            return Err(StemmaError::SerializationError(format!(
                "Relationship count mismatch: header says {}, found {}",
                self.relationship_count, actual.relationship_count
            )));
        }
        Ok(())
    }
}

/// Serialize a store to a binary snapshot.
pub fn store_to_bytes(store: &EntityStore) -> Result<Vec<u8>, StemmaError> {
    let header = postcard::to_stdvec(&SnapshotHeader::describe(store))
        .map_err(|e| StemmaError::SerializationError(format!("Header: {}", e)))?;
    let body = postcard::to_stdvec(store)
        .map_err(|e| StemmaError::SerializationError(format!("Data: {}", e)))?;

    let mut out = Vec::with_capacity(PREFIX_LEN + header.len() + body.len());
    out.extend_from_slice(MAGIC_BYTES);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&header);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize a store from a binary snapshot.
pub fn store_from_bytes(bytes: &[u8]) -> Result<EntityStore, StemmaError> {
    if bytes.len() < PREFIX_LEN {
        return Err(StemmaError::SerializationError(format!(
            "Data too short: minimum {} bytes required",
            PREFIX_LEN
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(StemmaError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    if &bytes[0..4] != MAGIC_BYTES {
        return Err(StemmaError::SerializationError(
            "Invalid magic bytes".to_string(),
        ));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(StemmaError::SerializationError(format!(
            "Unsupported version: {} (expected {})",
            bytes[4], FORMAT_VERSION
        )));
    }

    let (header, body): (SnapshotHeader, &[u8]) = postcard::take_from_bytes(&bytes[PREFIX_LEN..])
        .map_err(|e| StemmaError::SerializationError(format!("Header: {}", e)))?;

    // every member costs at least its id length byte and name length byte
    if header.member_count > body.len() as u64 {
        return Err(StemmaError::SerializationError(format!(
            "Member count {} is implausible for {} bytes of data",
            header.member_count,
            body.len()
        )));
    }

    let store: EntityStore = postcard::from_bytes(body).map_err(|e| {
        StemmaError::SerializationError(format!("Failed to deserialize tree data: {}", e))
    })?;
    header.verify(&store)?;
    Ok(store)
}

/// BLAKE3 hex digest of the binary snapshot of `store`.
///
/// Equal trees give equal digests, since the snapshot is canonical.
#[cfg(feature = "crypto-hash")]
pub fn snapshot_digest(store: &EntityStore) -> Result<String, StemmaError> {
    let bytes = store_to_bytes(store)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// =============================================================================
// TESTS
// =============================================================================
