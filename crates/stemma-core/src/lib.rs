//! # stemma-core
//!
//! The deterministic family-tree engine for Stemma.
//!
//! This crate holds everything that decides what a family tree looks like:
//! the stored records, the in-memory graph with its display state, rule-based
//! relationship inference, deletion, and reconciliation of two trees.
//!
//! ## Constraints
//!
//! - Synchronous and single-threaded; one [`TreeSession`] per open tree
//! - `BTreeMap` everywhere, integer arithmetic only
//! - Randomness is confined to member id generation
//! - No file or network I/O; the app layer owns both

// =============================================================================
// MODULES
// =============================================================================

pub mod family;
pub mod formats;
pub mod graph;
pub mod ids;
pub mod ingestor;
pub mod merge;
pub mod mutation;
pub mod primitives;
pub mod session;
pub mod similarity;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    EdgeType, ErrorKind, FamilyUnit, FamilyUnitId, Gender, GregorianDate, Member, MemberId,
    Paksham, StemmaError, TamilMonth, TamilStar, Thithi, TraditionalDate,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use graph::{Graph, GraphEdge, GraphNode, RenderEdge, RenderNode, RenderView, Visibility};
pub use ids::{BlockIdGenerator, IdGenerator, SequentialIdGenerator, generate_unique};
pub use ingestor::{DateParts, Ingestor, MemberDraft, TraditionalDraft};
pub use merge::{
    MemberMatch, MergeOutcome, MergeReport, ReconcileConfig, TreeMerger, merge_member_fields,
};
pub use mutation::{Established, MutationEngine, RelationshipOutcome};
pub use session::{MemberInfo, Neighborhood, OperationResult, Status, TreeSession};
pub use similarity::{Similarity, TokenSetRatio, name_similarity};
pub use store::{EntityStore, Relationships};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::snapshot_digest;
pub use formats::{SnapshotHeader, store_from_bytes, store_from_json, store_to_bytes, store_to_json};
