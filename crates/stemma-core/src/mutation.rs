//! # Mutation Engine
//!
//! Relationship assertions, rule-based inference and deletion on a [`Graph`].
//!
//! One assertion (source, target, type) becomes its edge, the reciprocal
//! edge, and whatever the fixed rule set derives from it:
//!
//! | Assertion                  | Derived                                              |
//! |----------------------------|------------------------------------------------------|
//! | `SPOUSE(a, b)`             | each spouse becomes parent of the other's children   |
//! | `PARENT_TO_CHILD(p, c)`    | the single spouse of `p` becomes parent of `c`       |
//! | `CHILD_TO_PARENT(c, n)`    | one other parent `o`: `SPOUSE(n, o)`                 |
//! |                            | several: advisory, `n` co-parents their other kids   |
//!
//! Derived assertions go through a work-list. They are applied with
//! inference disabled, except the new-parent spouse which may derive once
//! more (`MAX_INFERENCE_DEPTH`). Failures on derived assertions are logged
//! and reported in the advisory message; they never fail the call.
//!
//! The primary assertion is validated before anything is written.

use crate::graph::Graph;
use crate::primitives::{DEFAULT_ADVISORY, MAX_INFERENCE_DEPTH};
use crate::types::{EdgeType, MemberId, StemmaError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// A directed edge that a call newly created or removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Established {
    pub edge_type: EdgeType,
    pub source: MemberId,
    pub target: MemberId,
}

impl Established {
    #[must_use]
    pub fn new(edge_type: EdgeType, source: &MemberId, target: &MemberId) -> Self {
        Self {
            edge_type,
            source: source.clone(),
            target: target.clone(),
        }
    }
}

/// Result of [`MutationEngine::add_relationship`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipOutcome {
    /// Every directed edge the call created, primary first.
    pub established: Vec<Established>,
    /// Ambiguities and skipped inferences, or the default confirmation.
    pub message: String,
}

#[derive(Debug, Clone)]
struct Assertion {
    source: MemberId,
    target: MemberId,
    edge_type: EdgeType,
    depth: u8,
    infer: bool,
}

impl Assertion {
    /// A derived assertion that may not derive further.
    fn terminal(source: &MemberId, target: &MemberId, edge_type: EdgeType, depth: u8) -> Self {
        Self {
            source: source.clone(),
            target: target.clone(),
            edge_type,
            depth,
            infer: false,
        }
    }
}

/// The MutationEngine applies user-level edits to a graph.
pub struct MutationEngine;

impl MutationEngine {
    // =========================================================================
    // ADD
    // =========================================================================

    /// Parse `relationship_type` and assert it.
    pub fn add_relationship_token(
        graph: &mut Graph,
        source: &MemberId,
        target: &MemberId,
        relationship_type: &str,
        infer: bool,
    ) -> Result<RelationshipOutcome, StemmaError> {
        let edge_type: EdgeType = relationship_type.parse()?;
        Self::add_relationship(graph, source, target, edge_type, infer)
    }

    /// Assert `source -[edge_type]-> target` with its reciprocal, then infer.
    ///
    /// Re-asserting existing edges creates nothing and reports nothing.
    pub fn add_relationship(
        graph: &mut Graph,
        source: &MemberId,
        target: &MemberId,
        edge_type: EdgeType,
        infer: bool,
    ) -> Result<RelationshipOutcome, StemmaError> {
        graph.check_edge(source, target, edge_type, "add_relationship")?;

        let mut established = Vec::new();
        let mut advisories = Vec::new();
        let mut queue = VecDeque::new();

        Self::apply_pair(graph, source, target, edge_type, &mut established)?;
        if infer {
            let primary = Assertion {
                source: source.clone(),
                target: target.clone(),
                edge_type,
                depth: 0,
                infer,
            };
            Self::derive(graph, &primary, &mut queue, &mut advisories);
        }

        while let Some(assertion) = queue.pop_front() {
            let applied = Self::apply_pair(
                graph,
                &assertion.source,
                &assertion.target,
                assertion.edge_type,
                &mut established,
            );
            if let Err(e) = applied {
                warn!(
                    source = %assertion.source,
                    target = %assertion.target,
                    edge_type = %assertion.edge_type,
                    error = %e,
                    "inferred relationship skipped"
                );
                advisories.push(format!(
                    "Skipped inferred {} from {} to {}: {}",
                    assertion.edge_type, assertion.source, assertion.target, e
                ));
                continue;
            }
            if assertion.infer {
                Self::derive(graph, &assertion, &mut queue, &mut advisories);
            }
        }

        info!(
            %source,
            %target,
            %edge_type,
            established = established.len(),
            "relationship processed"
        );
        let message = if advisories.is_empty() {
            DEFAULT_ADVISORY.to_string()
        } else {
            advisories.join(" ")
        };
        Ok(RelationshipOutcome {
            established,
            message,
        })
    }

    /// Add an edge and its reciprocal, recording those that are new.
    fn apply_pair(
        graph: &mut Graph,
        source: &MemberId,
        target: &MemberId,
        edge_type: EdgeType,
        established: &mut Vec<Established>,
    ) -> Result<(), StemmaError> {
        // Validating one direction validates the reciprocal too.
        graph.check_edge(source, target, edge_type, "add_relationship")?;
        if graph.add_edge(source, target, edge_type)? {
            established.push(Established::new(edge_type, source, target));
        }
        let inverse = edge_type.inverse();
        if graph.add_edge(target, source, inverse)? {
            established.push(Established::new(inverse, target, source));
        }
        Ok(())
    }

    /// Queue the assertions implied by `assertion`.
    fn derive(
        graph: &Graph,
        assertion: &Assertion,
        queue: &mut VecDeque<Assertion>,
        advisories: &mut Vec<String>,
    ) {
        let next_depth = assertion.depth.saturating_add(1);
        match assertion.edge_type {
            EdgeType::Spouse => {
                let (a, b) = (&assertion.source, &assertion.target);
                let children_a = graph.get_children(a);
                let children_b = graph.get_children(b);
                for child in children_a.iter().filter(|c| *c != b && !children_b.contains(c)) {
                    queue.push_back(Assertion::terminal(
                        b,
                        child,
                        EdgeType::ParentToChild,
                        next_depth,
                    ));
                }
                for child in children_b.iter().filter(|c| *c != a && !children_a.contains(c)) {
                    queue.push_back(Assertion::terminal(
                        a,
                        child,
                        EdgeType::ParentToChild,
                        next_depth,
                    ));
                }
            }
            EdgeType::ParentToChild => {
                let (parent, child) = (&assertion.source, &assertion.target);
                let spouses: Vec<MemberId> = graph
                    .get_spouses(parent)
                    .into_iter()
                    .filter(|s| s != child)
                    .collect();
                match spouses.as_slice() {
                    [] => {}
                    [spouse] => {
                        if !graph.has_edge_of(spouse, child, EdgeType::ParentToChild) {
                            queue.push_back(Assertion::terminal(
                                spouse,
                                child,
                                EdgeType::ParentToChild,
                                next_depth,
                            ));
                        }
                    }
                    several => {
                        advisories.push(format!(
                            "Parent {} has multiple spouses {}; other parent of {} not inferred.",
                            parent,
                            id_list(several),
                            child
                        ));
                    }
                }
            }
            EdgeType::ChildToParent => {
                let (child, new_parent) = (&assertion.source, &assertion.target);
                let others: Vec<MemberId> = graph
                    .get_parents(child)
                    .into_iter()
                    .filter(|p| p != new_parent)
                    .collect();
                match others.as_slice() {
                    [] => {}
                    [other] => {
                        if !graph.has_edge_of(new_parent, other, EdgeType::Spouse) {
                            queue.push_back(Assertion {
                                source: new_parent.clone(),
                                target: other.clone(),
                                edge_type: EdgeType::Spouse,
                                depth: next_depth,
                                infer: assertion.depth < MAX_INFERENCE_DEPTH,
                            });
                        }
                    }
                    several => {
                        advisories.push(format!(
                            "Child {} has multiple other parents {}; no spouse inferred for {}.",
                            child,
                            id_list(several),
                            new_parent
                        ));
                        for other in several {
                            for sibling in graph.get_children(other) {
                                if &sibling == child
                                    || &sibling == new_parent
                                    || graph.has_edge_of(
                                        new_parent,
                                        &sibling,
                                        EdgeType::ParentToChild,
                                    )
                                {
                                    continue;
                                }
                                debug!(%new_parent, %sibling, "step-sibling co-parent inferred");
                                queue.push_back(Assertion::terminal(
                                    new_parent,
                                    &sibling,
                                    EdgeType::ParentToChild,
                                    next_depth,
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Remove a member and all its edges.
    ///
    /// With `cascade_orphans`, former neighbors left without any edge are
    /// removed as well. One pass suffices: a removed orphan had no edges, so
    /// its removal cannot orphan anyone else.
    ///
    /// Returns the removed ids, the requested member first.
    pub fn delete_member(
        graph: &mut Graph,
        id: &MemberId,
        cascade_orphans: bool,
    ) -> Result<Vec<MemberId>, StemmaError> {
        graph.require(id, "delete_member")?;
        let (_, neighbors) = graph.remove_member(id)?;
        let mut removed = vec![id.clone()];
        if cascade_orphans {
            for neighbor in neighbors {
                if graph.contains_member(&neighbor) && graph.degree(&neighbor) == 0 {
                    graph.remove_member(&neighbor)?;
                    debug!(member_id = %neighbor, "orphaned neighbor removed");
                    removed.push(neighbor);
                }
            }
        }
        info!(member_id = %id, removed = removed.len(), "member deleted");
        Ok(removed)
    }

    /// Remove the directed edge `source -> target`, and with
    /// `remove_inverse` its reciprocal.
    pub fn delete_relationship(
        graph: &mut Graph,
        source: &MemberId,
        target: &MemberId,
        remove_inverse: bool,
    ) -> Result<Vec<Established>, StemmaError> {
        const OPERATION: &str = "delete_relationship";
        graph.require(source, OPERATION)?;
        graph.require(target, OPERATION)?;
        let edge = graph
            .remove_edge(source, target)
            .ok_or_else(|| StemmaError::RelationshipNotFound {
                source_id: source.clone(),
                target_id: target.clone(),
                operation: OPERATION.to_string(),
            })?;
        let mut removed = vec![Established::new(edge.edge_type, source, target)];
        if remove_inverse && graph.has_edge_of(target, source, edge.edge_type.inverse()) {
            if let Some(reverse) = graph.remove_edge(target, source) {
                removed.push(Established::new(reverse.edge_type, target, source));
            }
        }
        info!(%source, %target, removed = removed.len(), "relationship deleted");
        Ok(removed)
    }
}

fn id_list(ids: &[MemberId]) -> String {
    let names: Vec<&str> = ids.iter().map(MemberId::as_str).collect();
    format!("[{}]", names.join(", "))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, Member};

    fn id(s: &str) -> MemberId {
        MemberId::from(s)
    }

    fn graph_with(ids: &[&str]) -> Graph {
        let mut graph = Graph::new();
        for m in ids {
            graph.add_member(Member::new(*m, *m)).expect("add");
        }
        graph
    }

    fn relate(
        graph: &mut Graph,
        s: &str,
        t: &str,
        edge_type: EdgeType,
        infer: bool,
    ) -> Result<RelationshipOutcome, StemmaError> {
        MutationEngine::add_relationship(graph, &id(s), &id(t), edge_type, infer)
    }

    fn link(graph: &mut Graph, s: &str, t: &str, edge_type: EdgeType) {
        MutationEngine::add_relationship(graph, &id(s), &id(t), edge_type, false).expect("link");
    }

    #[test]
    fn primary_edge_gets_reciprocal() {
        let mut graph = graph_with(&["P", "C"]);
        let outcome = relate(&mut graph, "P", "C", EdgeType::ParentToChild, true).expect("add");

        assert_eq!(
            outcome.established,
            vec![
                Established::new(EdgeType::ParentToChild, &id("P"), &id("C")),
                Established::new(EdgeType::ChildToParent, &id("C"), &id("P")),
            ]
        );
        assert_eq!(outcome.message, "Relationships processed.");
    }

    #[test]
    fn spouse_assertion_shares_children() {
        let mut graph = graph_with(&["A", "B", "C"]);
        link(&mut graph, "A", "C", EdgeType::ParentToChild);

        let outcome = relate(&mut graph, "A", "B", EdgeType::Spouse, true).expect("spouse");

        assert!(graph.has_edge_of(&id("B"), &id("C"), EdgeType::ParentToChild));
        assert!(graph.has_edge_of(&id("C"), &id("B"), EdgeType::ChildToParent));
        assert!(outcome
            .established
            .contains(&Established::new(EdgeType::Spouse, &id("A"), &id("B"))));
        assert!(outcome
            .established
            .contains(&Established::new(EdgeType::ParentToChild, &id("B"), &id("C"))));
        assert!(outcome
            .established
            .contains(&Established::new(EdgeType::ChildToParent, &id("C"), &id("B"))));
    }

    #[test]
    fn child_of_married_parent_gets_other_parent() {
        let mut graph = graph_with(&["A", "B", "C"]);
        link(&mut graph, "A", "B", EdgeType::Spouse);

        relate(&mut graph, "A", "C", EdgeType::ParentToChild, true).expect("child");

        assert_eq!(graph.get_parents(&id("C")), vec![id("A"), id("B")]);
    }

    #[test]
    fn second_parent_becomes_spouse_and_reenters_once() {
        let mut graph = graph_with(&["P1", "P2", "C", "D"]);
        link(&mut graph, "P1", "C", EdgeType::ParentToChild);
        link(&mut graph, "P2", "D", EdgeType::ParentToChild);

        let outcome = relate(&mut graph, "C", "P2", EdgeType::ChildToParent, true).expect("parent");

        assert!(graph.has_edge_of(&id("P2"), &id("P1"), EdgeType::Spouse));
        // re-entered spouse rule: P1 now co-parents D
        assert!(graph.has_edge_of(&id("P1"), &id("D"), EdgeType::ParentToChild));
        assert_eq!(outcome.message, "Relationships processed.");
    }

    #[test]
    fn ambiguous_other_parents_produce_advisory() {
        let mut graph = graph_with(&["P1", "P2", "P3", "C", "S"]);
        link(&mut graph, "P1", "C", EdgeType::ParentToChild);
        link(&mut graph, "P2", "C", EdgeType::ParentToChild);
        link(&mut graph, "P1", "S", EdgeType::ParentToChild);

        let outcome = relate(&mut graph, "C", "P3", EdgeType::ChildToParent, true).expect("parent");

        assert!(outcome.message.contains("P1"));
        assert!(outcome.message.contains("P2"));
        assert!(graph.get_spouses(&id("P3")).is_empty());
        assert!(graph.has_edge_of(&id("P3"), &id("S"), EdgeType::ParentToChild));
    }

    #[test]
    fn multiple_spouses_block_co_parent_inference() {
        let mut graph = graph_with(&["A", "B1", "B2", "C"]);
        link(&mut graph, "A", "B1", EdgeType::Spouse);
        link(&mut graph, "A", "B2", EdgeType::Spouse);

        let outcome = relate(&mut graph, "A", "C", EdgeType::ParentToChild, true).expect("child");

        assert_eq!(graph.get_parents(&id("C")), vec![id("A")]);
        assert!(outcome.message.contains("B1") && outcome.message.contains("B2"));
    }

    #[test]
    fn no_inference_when_disabled() {
        let mut graph = graph_with(&["A", "B", "C"]);
        link(&mut graph, "A", "C", EdgeType::ParentToChild);
        let outcome = relate(&mut graph, "A", "B", EdgeType::Spouse, false).expect("spouse");
        assert_eq!(outcome.established.len(), 2);
        assert!(!graph.has_child(&id("B")));
    }

    #[test]
    fn repeated_assertion_reports_nothing_new() {
        let mut graph = graph_with(&["A", "B", "C"]);
        link(&mut graph, "A", "C", EdgeType::ParentToChild);
        relate(&mut graph, "A", "B", EdgeType::Spouse, true).expect("first");
        let edges = graph.edge_count();
        let again = relate(&mut graph, "A", "B", EdgeType::Spouse, true).expect("second");
        assert!(again.established.is_empty());
        assert_eq!(graph.edge_count(), edges);
    }

    #[test]
    fn invalid_requests_leave_graph_untouched() {
        let mut graph = graph_with(&["A", "B"]);
        link(&mut graph, "A", "B", EdgeType::ParentToChild);
        let before = graph.edge_count();

        let same = relate(&mut graph, "A", "A", EdgeType::Spouse, true);
        assert_eq!(same.expect_err("self").kind(), ErrorKind::InvalidInput);
        let ghost = relate(&mut graph, "A", "Z", EdgeType::Spouse, true);
        assert_eq!(ghost.expect_err("ghost").kind(), ErrorKind::NotFound);
        let token =
            MutationEngine::add_relationship_token(&mut graph, &id("A"), &id("B"), "sibling", true);
        assert_eq!(token.expect_err("token").kind(), ErrorKind::InvalidInput);
        let conflict = relate(&mut graph, "A", "B", EdgeType::Spouse, true);
        assert_eq!(conflict.expect_err("conflict").kind(), ErrorKind::InvalidInput);

        assert_eq!(graph.edge_count(), before);
    }

    #[test]
    fn delete_member_cascades_orphans_once() {
        let mut graph = graph_with(&["A", "B", "C", "D"]);
        link(&mut graph, "A", "B", EdgeType::Spouse);
        link(&mut graph, "A", "C", EdgeType::ParentToChild);
        link(&mut graph, "C", "D", EdgeType::Spouse);

        let removed = MutationEngine::delete_member(&mut graph, &id("A"), true).expect("delete");
        assert_eq!(removed, vec![id("A"), id("B")]);
        assert!(graph.contains_member(&id("C")));
        assert!(graph.contains_member(&id("D")));
    }

    #[test]
    fn delete_member_without_cascade_keeps_neighbors() {
        let mut graph = graph_with(&["A", "B"]);
        link(&mut graph, "A", "B", EdgeType::Spouse);
        let removed = MutationEngine::delete_member(&mut graph, &id("A"), false).expect("delete");
        assert_eq!(removed, vec![id("A")]);
        assert!(graph.contains_member(&id("B")));
        assert_eq!(graph.edge_count(), 0);
        let err = MutationEngine::delete_member(&mut graph, &id("A"), false).expect_err("gone");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_relationship_single_and_inverse() {
        let mut graph = graph_with(&["A", "B"]);
        link(&mut graph, "A", "B", EdgeType::Spouse);

        let removed = MutationEngine::delete_relationship(&mut graph, &id("A"), &id("B"), false)
            .expect("delete");
        assert_eq!(removed.len(), 1);
        assert!(graph.contains_edge(&id("B"), &id("A")));
        assert_eq!(graph.edge(&id("B"), &id("A")).map(|e| e.is_rendered), Some(true));

        let removed = MutationEngine::delete_relationship(&mut graph, &id("B"), &id("A"), true)
            .expect("delete");
        assert_eq!(removed.len(), 1);
        assert_eq!(graph.edge_count(), 0);

        let err = MutationEngine::delete_relationship(&mut graph, &id("A"), &id("B"), true)
            .expect_err("gone");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
