//! # Formats
//!
//! Pure byte transformations of an [`crate::EntityStore`]. File I/O stays in
//! the app layer.
//!
//! - [`persistence`]: versioned binary snapshot (postcard)
//! - [`text`]: human-editable JSON

pub mod persistence;
pub mod text;

pub use persistence::{SnapshotHeader, store_from_bytes, store_to_bytes};
#[cfg(feature = "crypto-hash")]
pub use persistence::snapshot_digest;
pub use text::{store_from_json, store_to_json};
