//! # JSON Format
//!
//! Pretty-printed JSON of an [`EntityStore`], the interchange format of
//! family tree files. Missing optional fields default on read.

use crate::{EntityStore, StemmaError};

/// Serialize a store to pretty JSON.
pub fn store_to_json(store: &EntityStore) -> Result<String, StemmaError> {
    serde_json::to_string_pretty(store).map_err(|e| StemmaError::SerializationError(e.to_string()))
}

/// Parse a store from JSON.
pub fn store_from_json(json: &str) -> Result<EntityStore, StemmaError> {
    serde_json::from_str(json).map_err(|e| {
        StemmaError::SerializationError(format!("Failed to parse family tree JSON: {}", e))
    })
}
