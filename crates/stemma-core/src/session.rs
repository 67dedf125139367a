//! # Session Module
//!
//! One open family tree and the operations a caller performs on it.
//!
//! A `TreeSession` owns the [`Graph`], the [`IdGenerator`] for new members
//! and the [`ReconcileConfig`] used by merges. Every operation validates
//! before it mutates: on error the tree is unchanged. Whole-tree
//! replacements (`load_tree`, `merge_tree`) build the new graph first and
//! swap it in only when it is complete.

use crate::graph::{Graph, RenderView};
use crate::ids::{BlockIdGenerator, IdGenerator, generate_unique};
use crate::ingestor::{Ingestor, MemberDraft};
use crate::merge::{MergeReport, ReconcileConfig, TreeMerger};
use crate::mutation::{Established, MutationEngine};
use crate::similarity::TokenSetRatio;
use crate::store::EntityStore;
use crate::types::{EdgeType, FamilyUnit, Member, MemberId, StemmaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

// =============================================================================
// RESULTS
// =============================================================================

/// Outcome flag of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Structured result of a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: Status,
    pub message: String,
    /// The member the operation was about, if any.
    #[serde(default)]
    pub member_id: Option<MemberId>,
    /// Directed edges the operation created.
    #[serde(default)]
    pub established: Vec<Established>,
    /// Directed edges the operation removed.
    #[serde(default)]
    pub removed_edges: Vec<Established>,
    /// Members the operation removed.
    #[serde(default)]
    pub removed_members: Vec<MemberId>,
}

impl OperationResult {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            member_id: None,
            established: Vec::new(),
            removed_edges: Vec::new(),
            removed_members: Vec::new(),
        }
    }

    /// Failure result for a transport that reports errors in-band.
    #[must_use]
    pub fn error(err: &StemmaError) -> Self {
        Self {
            status: Status::Error,
            ..Self::ok(err.to_string())
        }
    }

    #[must_use]
    fn for_member(mut self, id: &MemberId) -> Self {
        self.member_id = Some(id.clone());
        self
    }
}

/// A member with its direct relatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    pub member: Member,
    pub parents: Vec<Member>,
    pub spouses: Vec<Member>,
    pub children: Vec<Member>,
    pub birth_family: Option<FamilyUnit>,
    pub acquired_family: Option<FamilyUnit>,
}

/// A group of relatives that can be expanded or collapsed in a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    Parents,
    Children,
    Spouses,
    Siblings,
    InLaws,
}

impl Neighborhood {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parents => "parents",
            Self::Children => "children",
            Self::Spouses => "spouses",
            Self::Siblings => "siblings",
            Self::InLaws => "inlaws",
        }
    }

    /// The edge type that reaches this neighborhood, when it is one hop.
    const fn edge_type(self) -> Option<EdgeType> {
        match self {
            Self::Parents => Some(EdgeType::ChildToParent),
            Self::Children => Some(EdgeType::ParentToChild),
            Self::Spouses => Some(EdgeType::Spouse),
            Self::Siblings | Self::InLaws => None,
        }
    }
}

impl fmt::Display for Neighborhood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Neighborhood {
    type Err = StemmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parents" => Ok(Self::Parents),
            "children" => Ok(Self::Children),
            "spouses" | "spouse" => Ok(Self::Spouses),
            "siblings" => Ok(Self::Siblings),
            "inlaws" | "in-laws" => Ok(Self::InLaws),
            other => Err(StemmaError::invalid_input(
                "parse_neighborhood",
                Some("neighborhood"),
                format!(
                    "Unknown neighborhood '{other}'. \
                     Use parents, children, spouses, siblings or inlaws."
                ),
            )),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// An open family tree.
pub struct TreeSession {
    graph: Graph,
    ids: Box<dyn IdGenerator>,
    config: ReconcileConfig,
}

impl Default for TreeSession {
    fn default() -> Self {
        Self::new(Box::new(BlockIdGenerator), ReconcileConfig::default())
    }
}

impl fmt::Debug for TreeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeSession")
            .field("members", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TreeSession {
    /// Create a session over an empty tree.
    #[must_use]
    pub fn new(ids: Box<dyn IdGenerator>, config: ReconcileConfig) -> Self {
        Self {
            graph: Graph::new(),
            ids,
            config,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    // =========================================================================
    // WHOLE TREE
    // =========================================================================

    /// Replace the open tree with `store`.
    ///
    /// Every stored member must pass the same checks as a new member.
    pub fn load_tree(&mut self, store: &EntityStore) -> Result<OperationResult, StemmaError> {
        validate_members(store, "load_tree")?;
        let graph = Graph::from_store(store)?;
        info!(
            members = graph.node_count(),
            edges = graph.edge_count(),
            "family tree loaded"
        );
        self.graph = graph;
        Ok(OperationResult::ok("Family tree loaded successfully."))
    }

    /// The open tree as stored records.
    #[must_use]
    pub fn save_tree(&self) -> EntityStore {
        self.graph.to_store()
    }

    /// Merge `incoming` into the open tree.
    ///
    /// Incoming members are validated first. The person of interest of the
    /// open tree is kept.
    pub fn merge_tree(
        &mut self,
        incoming: &EntityStore,
    ) -> Result<(OperationResult, MergeReport), StemmaError> {
        validate_members(incoming, "merge_tree")?;
        let base = self.graph.to_store();
        let merger = TreeMerger::new(&TokenSetRatio, self.config);
        let outcome = merger.merge(&base, incoming, self.ids.as_mut())?;
        let graph = Graph::from_store(&outcome.store)?;
        self.graph = graph;
        Ok((
            OperationResult::ok("Family tree merged successfully."),
            outcome.report,
        ))
    }

    // =========================================================================
    // MEMBERS
    // =========================================================================

    /// Add a member, optionally related to an existing `source`.
    ///
    /// With a source, `source -[relationship]-> new member` is asserted.
    /// The first member of an empty tree becomes the person of interest.
    pub fn add_member(
        &mut self,
        draft: &MemberDraft,
        source: Option<&MemberId>,
        relationship: Option<EdgeType>,
        infer: bool,
    ) -> Result<OperationResult, StemmaError> {
        const OPERATION: &str = "add_member";
        let link = match (source, relationship) {
            (Some(source), Some(edge_type)) => {
                self.graph.require(source, OPERATION)?;
                Some((source, edge_type))
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(StemmaError::invalid_input(
                    OPERATION,
                    Some("relationship_type"),
                    "A relationship type is required when a source member is given.",
                ));
            }
            (None, Some(_)) => {
                return Err(StemmaError::invalid_input(
                    OPERATION,
                    Some("source_id"),
                    "A source member is required when a relationship type is given.",
                ));
            }
        };

        let id = match draft.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) => {
                let id = MemberId::new(requested);
                if self.graph.contains_member(&id) {
                    return Err(StemmaError::invalid_input(
                        OPERATION,
                        Some("id"),
                        format!("Member ID '{}' already exists in the tree.", id),
                    ));
                }
                id
            }
            None => generate_unique(self.ids.as_mut(), |c| self.graph.contains_member(c))?,
        };
        let member = Ingestor::build_member(id.clone(), draft)?;
        let first = self.graph.is_empty();

        self.graph.add_member(member)?;
        let mut result = OperationResult::ok("Family member added successfully.").for_member(&id);
        if let Some((source, edge_type)) = link {
            match MutationEngine::add_relationship(&mut self.graph, source, &id, edge_type, infer) {
                Ok(outcome) => {
                    result.established = outcome.established;
                    result.message = format!("{} {}", result.message, outcome.message);
                }
                Err(e) => {
                    // leave no half-added member behind
                    self.graph.remove_member(&id)?;
                    return Err(e);
                }
            }
        }
        if first {
            self.graph.set_person_of_interest(&id)?;
        }
        info!(member_id = %id, "family member added");
        Ok(result)
    }

    /// Replace the fields of an existing member. The id never changes.
    pub fn update_member(
        &mut self,
        id: &MemberId,
        draft: &MemberDraft,
    ) -> Result<OperationResult, StemmaError> {
        const OPERATION: &str = "update_member";
        self.graph.require(id, OPERATION)?;
        if let Some(requested) = draft.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if requested != id.as_str() {
                return Err(StemmaError::invalid_input(
                    OPERATION,
                    Some("id"),
                    format!("Member ID '{}' cannot be changed to '{}'.", id, requested),
                ));
            }
        }
        let member = Ingestor::build_member(id.clone(), draft)?;
        self.graph.replace_member(member)?;
        info!(member_id = %id, "family member updated");
        Ok(OperationResult::ok("Family member updated successfully.").for_member(id))
    }

    /// Remove a member, and with `cascade_orphans` any relative left
    /// without relationships.
    pub fn delete_member(
        &mut self,
        id: &MemberId,
        cascade_orphans: bool,
    ) -> Result<OperationResult, StemmaError> {
        let removed = MutationEngine::delete_member(&mut self.graph, id, cascade_orphans)?;
        let mut result = OperationResult::ok("Family member deleted successfully.").for_member(id);
        result.removed_members = removed;
        Ok(result)
    }

    /// Relatives and family units of `id`.
    pub fn member_info(&self, id: &MemberId) -> Result<MemberInfo, StemmaError> {
        let node = self.graph.require(id, "member_info")?;
        let collect = |ids: Vec<MemberId>| -> Vec<Member> {
            ids.iter()
                .filter_map(|i| self.graph.member(i).cloned())
                .collect()
        };
        Ok(MemberInfo {
            member: node.member.clone(),
            parents: collect(self.graph.get_parents(id)),
            spouses: collect(self.graph.get_spouses(id)),
            children: collect(self.graph.get_children(id)),
            birth_family: self.graph.birth_family(id).cloned(),
            acquired_family: self.graph.acquired_family(id).cloned(),
        })
    }

    // =========================================================================
    // RELATIONSHIPS
    // =========================================================================

    /// Assert a relationship and its inferences.
    pub fn add_relationship(
        &mut self,
        source: &MemberId,
        target: &MemberId,
        edge_type: EdgeType,
        infer: bool,
    ) -> Result<OperationResult, StemmaError> {
        let outcome =
            MutationEngine::add_relationship(&mut self.graph, source, target, edge_type, infer)?;
        let mut result = OperationResult::ok(outcome.message).for_member(source);
        result.established = outcome.established;
        Ok(result)
    }

    /// Remove one directed relationship, and with `remove_inverse` its
    /// reciprocal.
    pub fn delete_relationship(
        &mut self,
        source: &MemberId,
        target: &MemberId,
        remove_inverse: bool,
    ) -> Result<OperationResult, StemmaError> {
        let removed =
            MutationEngine::delete_relationship(&mut self.graph, source, target, remove_inverse)?;
        let mut result =
            OperationResult::ok("Relationship deleted successfully.").for_member(source);
        result.removed_edges = removed;
        Ok(result)
    }

    // =========================================================================
    // VIEW
    // =========================================================================

    pub fn set_person_of_interest(
        &mut self,
        id: &MemberId,
    ) -> Result<OperationResult, StemmaError> {
        self.graph.set_person_of_interest(id)?;
        Ok(OperationResult::ok("Person of interest set.").for_member(id))
    }

    /// Show a neighborhood of `id` in the view.
    pub fn expand(
        &mut self,
        id: &MemberId,
        neighborhood: Neighborhood,
    ) -> Result<Vec<MemberId>, StemmaError> {
        let edge_type = Self::view_edge(neighborhood, "expand")?;
        self.graph.expand(id, edge_type)
    }

    /// Hide a neighborhood of `id` in the view.
    pub fn collapse(
        &mut self,
        id: &MemberId,
        neighborhood: Neighborhood,
    ) -> Result<Vec<MemberId>, StemmaError> {
        let edge_type = Self::view_edge(neighborhood, "collapse")?;
        self.graph.collapse(id, edge_type)
    }

    fn view_edge(neighborhood: Neighborhood, operation: &str) -> Result<EdgeType, StemmaError> {
        neighborhood
            .edge_type()
            .ok_or_else(|| StemmaError::unsupported(operation, neighborhood.as_str()))
    }

    #[must_use]
    pub fn render_view(&self) -> RenderView {
        self.graph.render_view()
    }

    #[must_use]
    pub fn summary_text(&self, limit: usize) -> String {
        self.graph.summary_text(limit)
    }
}

/// Run every stored member through the [`Ingestor`] rules.
fn validate_members(store: &EntityStore, operation: &str) -> Result<(), StemmaError> {
    for member in store.members.values() {
        let draft = MemberDraft::from_member(member);
        if let Err(e) = Ingestor::build_member(member.id.clone(), &draft) {
            warn!(member_id = %member.id, error = %e, "stored member rejected");
            return Err(StemmaError::invalid_input(
                operation,
                Some("members"),
                format!("Stored member '{}' is invalid: {}", member.id, e),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
