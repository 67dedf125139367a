//! # Core Type Definitions
//!
//! This module contains all core types for the Stemma family-tree model:
//! - Identifiers (`MemberId`, `FamilyUnitId`)
//! - Person records (`Member`, `Gender`, `GregorianDate`, `TraditionalDate`)
//! - Relationship vocabulary (`EdgeType`)
//! - Family grouping records (`FamilyUnit`)
//! - Error types (`StemmaError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`/`BTreeSet`
//! - Represent absent values with `Option`, never with a magic zero

mod traditional;

pub use traditional::{Paksham, TamilMonth, TamilStar, Thithi, TraditionalDate};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique, immutable identifier of a member within one tree.
///
/// The shape is not constrained beyond being non-empty; generators in
/// [`crate::ids`] produce block ids such as `F3K9-MZ01-B7QQ-R2XA`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    /// Create a new member identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a family unit record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyUnitId(pub String);

impl FamilyUnitId {
    /// Create a new family unit identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FamilyUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// MEMBER ATTRIBUTES
// =============================================================================

/// Recorded gender of a member.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    #[default]
    Unknown,
    Male,
    Female,
    Other,
}

impl Gender {
    /// Canonical upper-case token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
        }
    }

    /// Returns `true` unless the gender is `Unknown`.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = StemmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            "OTHER" => Ok(Self::Other),
            "UNKNOWN" | "GENDER_UNKNOWN" => Ok(Self::Unknown),
            other => Err(StemmaError::invalid_input(
                "parse_gender",
                Some("gender"),
                format!("Unknown gender token '{}'.", other),
            )),
        }
    }
}

/// A complete Gregorian calendar date.
///
/// Partial dates never reach this type; [`crate::ingestor`] rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GregorianDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl GregorianDate {
    #[must_use]
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Convert to a `chrono` date, `None` if the parts are not a calendar date.
    #[must_use]
    pub fn to_naive(self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for GregorianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

// =============================================================================
// MEMBER
// =============================================================================

/// A person record.
///
/// The `id` is assigned once and never changes. All other fields can be
/// replaced by an update or merged from another tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub gender: Gender,
    /// `None` when the living status was never recorded.
    #[serde(default)]
    pub alive: Option<bool>,
    #[serde(default)]
    pub date_of_birth: Option<GregorianDate>,
    #[serde(default)]
    pub date_of_death: Option<GregorianDate>,
    #[serde(default)]
    pub wedding_date: Option<GregorianDate>,
    /// Tamil month and star of birth.
    #[serde(default)]
    pub traditional_date_of_birth: Option<TraditionalDate>,
    /// Tamil month, paksham and thithi of death.
    #[serde(default)]
    pub traditional_date_of_death: Option<TraditionalDate>,
    /// Free-form attributes such as `image_location`.
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl Member {
    /// Create a member with only an id and a name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
            nicknames: Vec::new(),
            gender: Gender::Unknown,
            alive: None,
            date_of_birth: None,
            date_of_death: None,
            wedding_date: None,
            traditional_date_of_birth: None,
            traditional_date_of_death: None,
            additional_info: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    #[must_use]
    pub fn with_birth(mut self, date: GregorianDate) -> Self {
        self.date_of_birth = Some(date);
        self
    }

    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nicknames.push(nickname.into());
        self
    }

    /// Living status; unrecorded counts as alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.unwrap_or(true)
    }

    /// Birth year, if a birth date is recorded.
    #[must_use]
    pub fn birth_year(&self) -> Option<i32> {
        self.date_of_birth.map(|d| d.year)
    }

    /// The display name followed by every nickname.
    #[must_use]
    pub fn all_names(&self) -> Vec<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.nicknames.iter().map(String::as_str))
            .filter(|n| !n.trim().is_empty())
            .collect()
    }
}

// =============================================================================
// RELATIONSHIP VOCABULARY
// =============================================================================

/// Type of a directed relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// `source` is a parent of `target`.
    ParentToChild,
    /// `source` is a child of `target`.
    ChildToParent,
    /// `source` is married to `target`.
    Spouse,
}

impl EdgeType {
    /// The logical inverse used for the reciprocal edge.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::ParentToChild => Self::ChildToParent,
            Self::ChildToParent => Self::ParentToChild,
            Self::Spouse => Self::Spouse,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParentToChild => "PARENT_TO_CHILD",
            Self::ChildToParent => "CHILD_TO_PARENT",
            Self::Spouse => "SPOUSE",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = StemmaError;

    /// Accepts the canonical tokens and the short forms `child`
    /// (target is a child of source), `parent` and `spouse`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PARENT_TO_CHILD" | "CHILD" => Ok(Self::ParentToChild),
            "CHILD_TO_PARENT" | "PARENT" => Ok(Self::ChildToParent),
            "SPOUSE" => Ok(Self::Spouse),
            _ => Err(StemmaError::invalid_input(
                "parse_relationship_type",
                Some("relationship_type"),
                format!(
                    "Unknown relationship type '{}'. Use: PARENT_TO_CHILD, CHILD_TO_PARENT, SPOUSE",
                    s
                ),
            )),
        }
    }
}

// =============================================================================
// FAMILY UNIT
// =============================================================================

/// A household grouping: the parents and the children they raise together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyUnit {
    pub id: FamilyUnitId,
    pub name: String,
    #[serde(default)]
    pub parent_ids: Vec<MemberId>,
    #[serde(default)]
    pub child_ids: Vec<MemberId>,
}

impl FamilyUnit {
    #[must_use]
    pub fn new(id: FamilyUnitId) -> Self {
        Self {
            id,
            name: String::new(),
            parent_ids: Vec::new(),
            child_ids: Vec::new(),
        }
    }

    /// Returns `true` when the unit has neither parents nor children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent_ids.is_empty() && self.child_ids.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse error classification an outer transport maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Unsupported,
    Internal,
}

/// Errors that can occur in the Stemma system.
///
/// - No silent failures
/// - Use `Result<T, StemmaError>` for fallible operations
/// - A rejected request leaves the tree unmodified
#[derive(Debug, Error)]
pub enum StemmaError {
    /// The operation references a member absent from the tree.
    #[error("Member with ID '{member_id}' not found during operation '{operation}'.")]
    MemberNotFound {
        member_id: MemberId,
        operation: String,
    },

    /// The operation references a directed relationship absent from the tree.
    #[error(
        "Relationship from '{source_id}' to '{target_id}' not found during operation '{operation}'."
    )]
    RelationshipNotFound {
        source_id: MemberId,
        target_id: MemberId,
        operation: String,
    },

    /// A business rule rejected the request.
    #[error("Invalid input for operation '{operation}'{}: {description}", field_suffix(.field))]
    InvalidInput {
        operation: String,
        field: Option<String>,
        description: String,
    },

    /// A recognized capability that is intentionally not implemented.
    #[error("Unsupported operation '{operation}'. Feature '{feature}' is not implemented.")]
    Unsupported { operation: String, feature: String },

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Inconsistent internal state.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_ref()
        .map(|f| format!(" (field '{}')", f))
        .unwrap_or_default()
}

impl StemmaError {
    /// Build a `MemberNotFound` error.
    pub fn not_found(member_id: &MemberId, operation: &str) -> Self {
        Self::MemberNotFound {
            member_id: member_id.clone(),
            operation: operation.to_string(),
        }
    }

    /// Build an `InvalidInput` error.
    pub fn invalid_input(
        operation: &str,
        field: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            operation: operation.to_string(),
            field: field.map(str::to_string),
            description: description.into(),
        }
    }

    /// Build an `Unsupported` error.
    pub fn unsupported(operation: &str, feature: &str) -> Self {
        Self::Unsupported {
            operation: operation.to_string(),
            feature: feature.to_string(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MemberNotFound { .. } | Self::RelationshipNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::SerializationError(_) | Self::IoError(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP-style status code for an outer transport layer.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput => 400,
            ErrorKind::Unsupported => 501,
            ErrorKind::Internal => 500,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_type_inverse_is_involution() {
        for edge_type in [EdgeType::ParentToChild, EdgeType::ChildToParent, EdgeType::Spouse] {
            assert_eq!(edge_type.inverse().inverse(), edge_type);
        }
        assert_eq!(EdgeType::ParentToChild.inverse(), EdgeType::ChildToParent);
    }

    #[test]
    fn edge_type_parses_canonical_and_short_tokens() {
        assert_eq!("SPOUSE".parse::<EdgeType>().expect("parse"), EdgeType::Spouse);
        assert_eq!("child".parse::<EdgeType>().expect("parse"), EdgeType::ParentToChild);
        assert_eq!("Parent".parse::<EdgeType>().expect("parse"), EdgeType::ChildToParent);
        assert_eq!(
            "child_to_parent".parse::<EdgeType>().expect("parse"),
            EdgeType::ChildToParent
        );
    }

    #[test]
    fn unknown_edge_token_is_invalid_input() {
        let err = "cousin".parse::<EdgeType>().expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn gender_tokens() {
        assert_eq!("female".parse::<Gender>().expect("parse"), Gender::Female);
        assert_eq!("GENDER_UNKNOWN".parse::<Gender>().expect("parse"), Gender::Unknown);
        assert!("robot".parse::<Gender>().is_err());
        assert!(!Gender::Unknown.is_known());
    }

    #[test]
    fn error_messages_name_id_and_operation() {
        let err = StemmaError::not_found(&MemberId::from("M1"), "delete_member");
        assert_eq!(
            err.to_string(),
            "Member with ID 'M1' not found during operation 'delete_member'."
        );
        assert_eq!(err.status_code(), 404);

        let err = StemmaError::unsupported("expand", "siblings");
        assert_eq!(
            err.to_string(),
            "Unsupported operation 'expand'. Feature 'siblings' is not implemented."
        );
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn all_names_skips_blank_nicknames() {
        let member = Member::new("R1", "Ronald Weasley")
            .with_nickname("Won-Won")
            .with_nickname("  ");
        assert_eq!(member.all_names(), vec!["Ronald Weasley", "Won-Won"]);
        assert!(member.is_alive());
    }

    #[test]
    fn gregorian_date_validation_through_chrono() {
        assert!(GregorianDate::new(1980, 2, 29).to_naive().is_some());
        assert!(GregorianDate::new(1981, 2, 29).to_naive().is_none());
        assert_eq!(GregorianDate::new(1980, 3, 1).to_string(), "1980-03-01");
    }
}
