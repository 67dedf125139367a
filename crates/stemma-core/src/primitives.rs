//! # Fixed Primitives
//!
//! Hardcoded constants for the Stemma model.
//!
//! Merge weights have configurable counterparts in
//! [`crate::merge::ReconcileConfig`]; the values here are its defaults.

// =============================================================================
// INFERENCE
// =============================================================================

/// How many times an inferred assertion may itself trigger inference.
///
/// Only the new-parent rule produces re-enterable assertions, and only
/// up to this depth. Everything else is applied with inference disabled.
pub const MAX_INFERENCE_DEPTH: u8 = 1;

/// Advisory message returned when an operation raised no ambiguity.
pub const DEFAULT_ADVISORY: &str = "Relationships processed.";

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Scores are expressed in per-mille: 1000 means a perfect match.
pub const SCORE_SCALE: u32 = 1000;

/// Final score a candidate must strictly exceed to be merged (0.8).
pub const MATCH_THRESHOLD_PER_MILLE: u32 = 800;

/// Share of the neighbor similarity added to the base score (0.2).
pub const NEIGHBOR_WEIGHT_PERCENT: u32 = 20;

/// Points awarded for equal known genders, on the 0..=100 name scale.
pub const GENDER_MATCH_POINTS: u32 = 20;

/// Points awarded for equal known birth years, on the 0..=100 name scale.
pub const BIRTH_YEAR_MATCH_POINTS: u32 = 20;

// =============================================================================
// MEMBER VALIDATION
// =============================================================================

/// Earliest year accepted for any recorded date.
pub const MIN_RECORDED_YEAR: i32 = 1000;

/// Maximum length for names and nicknames.
pub const MAX_NAME_LENGTH: usize = 512;

/// Maximum number of nicknames per member.
pub const MAX_NICKNAMES: usize = 64;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Attempts a generator gets to produce an id not already taken.
pub const MAX_ID_ATTEMPTS: usize = 64;

/// Prefix of generated family unit ids.
pub const FAMILY_UNIT_PREFIX: &str = "FUNT";

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Magic bytes for the Stemma binary snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"STMA";

/// Current binary snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum accepted size of a serialized tree (64 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 64 * 1024 * 1024;
