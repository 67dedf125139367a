//! # Graph Model
//!
//! The in-memory family graph for Stemma.
//!
//! Nodes are members carrying tri-state visibility flags, edges are typed
//! directed relationships carrying a rendered flag. At most one edge exists
//! per ordered pair. All data structures use `BTreeMap` for deterministic
//! ordering.
//!
//! ## Missing endpoints
//!
//! Every primitive mutator checks both endpoints. A missing member is logged
//! with `tracing::warn!` and the call returns `StemmaError::MemberNotFound`
//! without touching the graph.
//!
//! Primitive mutators add exactly one directed edge. Reciprocals are the
//! responsibility of [`crate::mutation::MutationEngine`] and
//! [`Graph::from_store`].

use crate::store::{EntityStore, Relationships};
use crate::types::{EdgeType, FamilyUnit, FamilyUnitId, Gender, Member, MemberId, StemmaError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

// =============================================================================
// NODE & EDGE
// =============================================================================

/// Tri-state marker for one kind of relation on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// No relation of this kind is known.
    #[default]
    Unknown,
    /// Relations exist but are collapsed.
    Pending,
    /// Relations exist and are expanded.
    Shown,
}

impl Visibility {
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// A member node with its display state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub member: Member,
    pub is_poi: bool,
    pub is_visible: bool,
    pub spouses: Visibility,
    pub parents: Visibility,
    pub children: Visibility,
    pub(crate) birth_family: Option<FamilyUnitId>,
    pub(crate) acquired_family: Option<FamilyUnitId>,
}

impl GraphNode {
    fn new(member: Member) -> Self {
        Self {
            member,
            is_poi: false,
            is_visible: false,
            spouses: Visibility::Unknown,
            parents: Visibility::Unknown,
            children: Visibility::Unknown,
            birth_family: None,
            acquired_family: None,
        }
    }

    /// The flag tracking outgoing edges of `edge_type`.
    pub(crate) fn flag_mut(&mut self, edge_type: EdgeType) -> &mut Visibility {
        match edge_type {
            EdgeType::ParentToChild => &mut self.children,
            EdgeType::ChildToParent => &mut self.parents,
            EdgeType::Spouse => &mut self.spouses,
        }
    }
}

/// A directed relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub edge_type: EdgeType,
    pub is_rendered: bool,
}

// =============================================================================
// GRAPH
// =============================================================================

/// The family graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<MemberId, GraphNode>,
    /// Outgoing edges keyed by source then target.
    edges: BTreeMap<MemberId, BTreeMap<MemberId, GraphEdge>>,
    /// Reverse index: target to the sources pointing at it.
    incoming: BTreeMap<MemberId, BTreeSet<MemberId>>,
    pub(crate) family_units: BTreeMap<FamilyUnitId, FamilyUnit>,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains_member(&self, id: &MemberId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.nodes.get(id).map(|n| &n.member)
    }

    #[must_use]
    pub fn node(&self, id: &MemberId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &MemberId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Look up a node or fail with `MemberNotFound` naming `operation`.
    pub fn require(&self, id: &MemberId, operation: &str) -> Result<&GraphNode, StemmaError> {
        self.nodes
            .get(id)
            .ok_or_else(|| StemmaError::not_found(id, operation))
    }

    /// Iterate all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (&MemberId, &GraphNode)> {
        self.nodes.iter()
    }

    /// Iterate all member ids in order.
    pub fn member_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.nodes.keys()
    }

    /// Iterate all edges as (source, target, edge) in deterministic order.
    pub fn edges(&self) -> impl Iterator<Item = (&MemberId, &MemberId, &GraphEdge)> {
        self.edges
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |(to, edge)| (from, to, edge)))
    }

    #[must_use]
    pub fn edge(&self, from: &MemberId, to: &MemberId) -> Option<&GraphEdge> {
        self.edges.get(from).and_then(|t| t.get(to))
    }

    #[must_use]
    pub fn contains_edge(&self, from: &MemberId, to: &MemberId) -> bool {
        self.edge(from, to).is_some()
    }

    /// Returns `true` when `from -> to` exists with exactly `edge_type`.
    #[must_use]
    pub fn has_edge_of(&self, from: &MemberId, to: &MemberId, edge_type: EdgeType) -> bool {
        self.edge(from, to).is_some_and(|e| e.edge_type == edge_type)
    }

    /// Edges touching `id` in either direction.
    #[must_use]
    pub fn degree(&self, id: &MemberId) -> usize {
        let outgoing = self.edges.get(id).map_or(0, BTreeMap::len);
        let incoming = self.incoming.get(id).map_or(0, BTreeSet::len);
        outgoing + incoming
    }

    /// Every member linked to `id` by an edge in either direction.
    #[must_use]
    pub fn neighbors(&self, id: &MemberId) -> BTreeSet<MemberId> {
        let mut out: BTreeSet<MemberId> = self
            .edges
            .get(id)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(sources) = self.incoming.get(id) {
            out.extend(sources.iter().cloned());
        }
        out
    }

    // =========================================================================
    // MEMBERS
    // =========================================================================

    /// Insert a member node. Fails if the id is blank or already present.
    pub fn add_member(&mut self, member: Member) -> Result<(), StemmaError> {
        if member.id.is_blank() {
            return Err(StemmaError::invalid_input(
                "add_member",
                Some("id"),
                "Member ID cannot be empty.",
            ));
        }
        if self.nodes.contains_key(&member.id) {
            return Err(StemmaError::invalid_input(
                "add_member",
                Some("id"),
                format!("Member ID '{}' already exists in the tree.", member.id),
            ));
        }
        debug!(member_id = %member.id, "member added");
        self.nodes.insert(member.id.clone(), GraphNode::new(member));
        Ok(())
    }

    /// Replace the record of an existing member, returning the old record.
    ///
    /// The id of `member` selects the node; the id itself never changes.
    pub fn replace_member(&mut self, member: Member) -> Result<Member, StemmaError> {
        let node = self
            .nodes
            .get_mut(&member.id)
            .ok_or_else(|| StemmaError::not_found(&member.id, "replace_member"))?;
        Ok(std::mem::replace(&mut node.member, member))
    }

    /// Remove a member and every edge touching it.
    ///
    /// Returns the removed record and the former neighbors in id order.
    pub fn remove_member(&mut self, id: &MemberId) -> Result<(Member, Vec<MemberId>), StemmaError> {
        if !self.nodes.contains_key(id) {
            warn!(member_id = %id, "remove_member on unknown member");
            return Err(StemmaError::not_found(id, "remove_member"));
        }
        let neighbors = self.neighbors(id);
        for other in &neighbors {
            self.remove_edge(id, other);
            self.remove_edge(other, id);
        }
        self.detach_from_family_units(id);
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| StemmaError::Internal(format!("node '{}' vanished", id)))?;
        self.edges.remove(id);
        self.incoming.remove(id);
        debug!(member_id = %id, neighbors = neighbors.len(), "member removed");
        Ok((node.member, neighbors.into_iter().collect()))
    }

    // =========================================================================
    // EDGE PRIMITIVES
    // =========================================================================

    /// Check that `from -> to` of `edge_type` may be inserted, without mutating.
    ///
    /// Passes when the identical edge already exists.
    pub fn check_edge(
        &self,
        from: &MemberId,
        to: &MemberId,
        edge_type: EdgeType,
        operation: &str,
    ) -> Result<(), StemmaError> {
        for id in [from, to] {
            if !self.nodes.contains_key(id) {
                warn!(
                    operation,
                    member_id = %id,
                    %edge_type,
                    "refusing edge with missing endpoint"
                );
                return Err(StemmaError::not_found(id, operation));
            }
        }
        if from == to {
            warn!(operation, member_id = %from, %edge_type, "refusing self edge");
            return Err(StemmaError::invalid_input(
                operation,
                Some("target_id"),
                "Source and target must be different members.",
            ));
        }
        if let Some(existing) = self.edge(from, to) {
            if existing.edge_type != edge_type {
                return Err(self.conflict(from, to, existing.edge_type, edge_type, operation));
            }
        }
        if let Some(reverse) = self.edge(to, from) {
            if reverse.edge_type != edge_type.inverse() {
                return Err(self.conflict(to, from, reverse.edge_type, edge_type, operation));
            }
        }
        Ok(())
    }

    fn conflict(
        &self,
        from: &MemberId,
        to: &MemberId,
        existing: EdgeType,
        requested: EdgeType,
        operation: &str,
    ) -> StemmaError {
        warn!(operation, %from, %to, %existing, %requested, "refusing conflicting edge");
        StemmaError::invalid_input(
            operation,
            Some("relationship_type"),
            format!(
                "Conflicting relationship: '{}' is already linked to '{}' as {}.",
                from, to, existing
            ),
        )
    }

    fn insert_edge(
        &mut self,
        from: &MemberId,
        to: &MemberId,
        edge_type: EdgeType,
        operation: &str,
    ) -> Result<bool, StemmaError> {
        self.check_edge(from, to, edge_type, operation)?;
        if self.contains_edge(from, to) {
            return Ok(false);
        }
        let is_rendered = match edge_type {
            EdgeType::ParentToChild => true,
            EdgeType::ChildToParent => false,
            EdgeType::Spouse => !self.contains_edge(to, from),
        };
        self.edges.entry(from.clone()).or_default().insert(
            to.clone(),
            GraphEdge {
                edge_type,
                is_rendered,
            },
        );
        self.incoming
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        if let Some(node) = self.nodes.get_mut(from) {
            let flag = node.flag_mut(edge_type);
            if *flag == Visibility::Unknown {
                *flag = Visibility::Pending;
            }
        }
        debug!(%from, %to, %edge_type, is_rendered, "edge added");
        Ok(true)
    }

    /// Add `parent -> child` as a rendered `PARENT_TO_CHILD` edge.
    ///
    /// Returns `Ok(false)` when the edge already existed.
    pub fn add_child_relation(
        &mut self,
        parent: &MemberId,
        child: &MemberId,
    ) -> Result<bool, StemmaError> {
        let added = self.insert_edge(parent, child, EdgeType::ParentToChild, "add_child_relation")?;
        if added {
            self.note_child_link(parent, child);
        }
        Ok(added)
    }

    /// Add `child -> parent` as a hidden `CHILD_TO_PARENT` edge.
    pub fn add_parent_relation(
        &mut self,
        child: &MemberId,
        parent: &MemberId,
    ) -> Result<bool, StemmaError> {
        let added =
            self.insert_edge(child, parent, EdgeType::ChildToParent, "add_parent_relation")?;
        if added {
            self.note_child_link(parent, child);
        }
        Ok(added)
    }

    /// Add `a -> b` as a `SPOUSE` edge, rendered unless `b -> a` exists.
    pub fn add_spouse_relation(&mut self, a: &MemberId, b: &MemberId) -> Result<bool, StemmaError> {
        let added = self.insert_edge(a, b, EdgeType::Spouse, "add_spouse_relation")?;
        if added {
            self.note_spouse_link(a, b);
        }
        Ok(added)
    }

    /// Dispatch to the primitive for `edge_type`.
    pub fn add_edge(
        &mut self,
        from: &MemberId,
        to: &MemberId,
        edge_type: EdgeType,
    ) -> Result<bool, StemmaError> {
        match edge_type {
            EdgeType::ParentToChild => self.add_child_relation(from, to),
            EdgeType::ChildToParent => self.add_parent_relation(from, to),
            EdgeType::Spouse => self.add_spouse_relation(from, to),
        }
    }

    /// Remove exactly the directed edge `from -> to`.
    ///
    /// A surviving reverse spouse edge becomes the rendered one.
    pub fn remove_edge(&mut self, from: &MemberId, to: &MemberId) -> Option<GraphEdge> {
        let removed = self.edges.get_mut(from)?.remove(to)?;
        if self.edges.get(from).is_some_and(BTreeMap::is_empty) {
            self.edges.remove(from);
        }
        if let Some(sources) = self.incoming.get_mut(to) {
            sources.remove(from);
            if sources.is_empty() {
                self.incoming.remove(to);
            }
        }
        if removed.edge_type == EdgeType::Spouse {
            if let Some(reverse) = self.edges.get_mut(to).and_then(|t| t.get_mut(from)) {
                reverse.is_rendered = true;
            }
        }
        let none_left = self.targets(from, removed.edge_type).is_empty();
        if none_left {
            if let Some(node) = self.nodes.get_mut(from) {
                *node.flag_mut(removed.edge_type) = Visibility::Unknown;
            }
        }
        match removed.edge_type {
            EdgeType::ParentToChild => self.note_child_unlink(from, to),
            EdgeType::ChildToParent => self.note_child_unlink(to, from),
            EdgeType::Spouse => {}
        }
        debug!(%from, %to, edge_type = %removed.edge_type, "edge removed");
        Some(removed)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    fn targets(&self, id: &MemberId, edge_type: EdgeType) -> Vec<MemberId> {
        self.edges
            .get(id)
            .map(|t| {
                t.iter()
                    .filter(|(_, e)| e.edge_type == edge_type)
                    .map(|(to, _)| to.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn flag(&self, id: &MemberId, edge_type: EdgeType) -> Visibility {
        self.nodes.get(id).map_or(Visibility::Unknown, |n| match edge_type {
            EdgeType::ParentToChild => n.children,
            EdgeType::ChildToParent => n.parents,
            EdgeType::Spouse => n.spouses,
        })
    }

    #[must_use]
    pub fn has_parent(&self, id: &MemberId) -> bool {
        self.flag(id, EdgeType::ChildToParent).is_known()
    }

    #[must_use]
    pub fn has_child(&self, id: &MemberId) -> bool {
        self.flag(id, EdgeType::ParentToChild).is_known()
    }

    #[must_use]
    pub fn has_spouse(&self, id: &MemberId) -> bool {
        self.flag(id, EdgeType::Spouse).is_known()
    }

    /// Parents of `id` in id order; empty for unknown members.
    #[must_use]
    pub fn get_parents(&self, id: &MemberId) -> Vec<MemberId> {
        self.targets(id, EdgeType::ChildToParent)
    }

    #[must_use]
    pub fn get_spouses(&self, id: &MemberId) -> Vec<MemberId> {
        self.targets(id, EdgeType::Spouse)
    }

    #[must_use]
    pub fn get_children(&self, id: &MemberId) -> Vec<MemberId> {
        self.targets(id, EdgeType::ParentToChild)
    }

    /// First parent of `id` by id order.
    #[must_use]
    pub fn get_parent(&self, id: &MemberId) -> Option<MemberId> {
        self.get_parents(id).into_iter().next()
    }

    /// First spouse of `id` by id order.
    #[must_use]
    pub fn get_spouse(&self, id: &MemberId) -> Option<MemberId> {
        self.get_spouses(id).into_iter().next()
    }

    // =========================================================================
    // DISPLAY STATE
    // =========================================================================

    /// Make `id` the single person of interest; it becomes visible.
    pub fn set_person_of_interest(&mut self, id: &MemberId) -> Result<(), StemmaError> {
        if !self.nodes.contains_key(id) {
            return Err(StemmaError::not_found(id, "set_person_of_interest"));
        }
        for (node_id, node) in &mut self.nodes {
            node.is_poi = node_id == id;
            if node.is_poi {
                node.is_visible = true;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn person_of_interest(&self) -> Option<&MemberId> {
        self.nodes.iter().find(|(_, n)| n.is_poi).map(|(id, _)| id)
    }

    /// Show the `edge_type` neighbors of `id`.
    ///
    /// `id` becomes visible and a `Pending` flag turns `Shown`. Returns the
    /// neighbors made visible.
    pub fn expand(
        &mut self,
        id: &MemberId,
        edge_type: EdgeType,
    ) -> Result<Vec<MemberId>, StemmaError> {
        if !self.nodes.contains_key(id) {
            return Err(StemmaError::not_found(id, "expand"));
        }
        let targets = self.targets(id, edge_type);
        for target in &targets {
            if let Some(node) = self.nodes.get_mut(target) {
                node.is_visible = true;
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.is_visible = true;
            let flag = node.flag_mut(edge_type);
            if flag.is_known() {
                *flag = Visibility::Shown;
            }
        }
        Ok(targets)
    }

    /// Hide the `edge_type` neighbors of `id`.
    ///
    /// A neighbor stays visible when it is the person of interest or another
    /// visible member still shows it. Returns the neighbors hidden.
    pub fn collapse(
        &mut self,
        id: &MemberId,
        edge_type: EdgeType,
    ) -> Result<Vec<MemberId>, StemmaError> {
        if !self.nodes.contains_key(id) {
            return Err(StemmaError::not_found(id, "collapse"));
        }
        if let Some(node) = self.nodes.get_mut(id) {
            let flag = node.flag_mut(edge_type);
            if *flag == Visibility::Shown {
                *flag = Visibility::Pending;
            }
        }
        let mut hidden = Vec::new();
        for target in self.targets(id, edge_type) {
            let keep = self.nodes.get(&target).is_some_and(|n| n.is_poi)
                || self.shown_by_other(&target, id);
            if keep {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&target) {
                if node.is_visible {
                    node.is_visible = false;
                    hidden.push(target);
                }
            }
        }
        Ok(hidden)
    }

    /// Whether a visible member other than `except` has `target` expanded.
    fn shown_by_other(&self, target: &MemberId, except: &MemberId) -> bool {
        let Some(sources) = self.incoming.get(target) else {
            return false;
        };
        sources.iter().filter(|s| *s != except).any(|source| {
            match (self.nodes.get(source), self.edge(source, target)) {
                (Some(node), Some(edge)) => {
                    node.is_visible && self.flag(source, edge.edge_type) == Visibility::Shown
                }
                _ => false,
            }
        })
    }

    // =========================================================================
    // ENTITY STORE CONVERSION
    // =========================================================================

    /// Build a graph from stored records.
    ///
    /// Every listed relation is loaded together with its reciprocal. A
    /// relation naming an unknown member, or contradicting another one,
    /// fails the whole load. Family units and the person of interest are
    /// restored as saved.
    pub fn from_store(store: &EntityStore) -> Result<Self, StemmaError> {
        let mut graph = Self::new();
        for (key, member) in &store.members {
            if key != &member.id {
                return Err(StemmaError::invalid_input(
                    "load_tree",
                    Some("id"),
                    format!(
                        "Member key '{}' does not match member ID '{}'.",
                        key, member.id
                    ),
                ));
            }
            graph.add_member(member.clone())?;
        }
        for unit in store.family_units.values() {
            graph.load_family_unit(unit);
        }
        for (source, rels) in &store.relationships {
            graph.require_loaded(source, "Source")?;
            for child in &rels.children_ids {
                graph.require_loaded(child, "Child")?;
                graph.load_edge_pair(source, child, EdgeType::ParentToChild)?;
            }
            for spouse in &rels.spouse_ids {
                graph.require_loaded(spouse, "Spouse")?;
                graph.load_edge_pair(source, spouse, EdgeType::Spouse)?;
            }
            for parent in &rels.parent_ids {
                graph.require_loaded(parent, "Parent")?;
                graph.load_edge_pair(source, parent, EdgeType::ChildToParent)?;
            }
        }
        if let Some(poi) = &store.person_of_interest {
            if !graph.contains_member(poi) {
                return Err(StemmaError::invalid_input(
                    "load_tree",
                    Some("person_of_interest"),
                    format!("Person of interest '{}' is not a member of the tree.", poi),
                ));
            }
            graph.set_person_of_interest(poi)?;
        }
        Ok(graph)
    }

    /// Insert `from -> to` and its reciprocal as stored.
    ///
    /// Family units come from the store, so the unit hooks stay silent.
    fn load_edge_pair(
        &mut self,
        from: &MemberId,
        to: &MemberId,
        edge_type: EdgeType,
    ) -> Result<(), StemmaError> {
        self.insert_edge(from, to, edge_type, "load_tree")?;
        self.insert_edge(to, from, edge_type.inverse(), "load_tree")?;
        Ok(())
    }

    fn require_loaded(&self, id: &MemberId, role: &str) -> Result<(), StemmaError> {
        if self.nodes.contains_key(id) {
            return Ok(());
        }
        warn!(member_id = %id, role, "relationship references unknown member");
        Err(StemmaError::invalid_input(
            "load_tree",
            Some("relationships"),
            format!("{} ID '{}' not found in graph nodes.", role, id),
        ))
    }

    /// Flatten the graph back into stored records.
    #[must_use]
    pub fn to_store(&self) -> EntityStore {
        let mut store = EntityStore::new();
        for node in self.nodes.values() {
            store.insert_member(node.member.clone());
        }
        for (from, targets) in &self.edges {
            let mut rels = Relationships::default();
            for (to, edge) in targets {
                match edge.edge_type {
                    EdgeType::ParentToChild => rels.children_ids.push(to.clone()),
                    EdgeType::Spouse => rels.spouse_ids.push(to.clone()),
                    EdgeType::ChildToParent => rels.parent_ids.push(to.clone()),
                }
            }
            if !rels.is_empty() {
                store.relationships.insert(from.clone(), rels);
            }
        }
        store.family_units = self.family_units.clone();
        store.person_of_interest = self.person_of_interest().cloned();
        store
    }

    // =========================================================================
    // RENDERING BOUNDARY
    // =========================================================================

    /// Read-only snapshot for an external renderer: every node, rendered
    /// edges only.
    #[must_use]
    pub fn render_view(&self) -> RenderView {
        let nodes = self
            .nodes
            .iter()
            .map(|(id, n)| RenderNode {
                id: id.clone(),
                label: n.member.name.clone(),
                gender: n.member.gender,
                alive: n.member.is_alive(),
                is_poi: n.is_poi,
                is_visible: n.is_visible,
                spouses: n.spouses,
                parents: n.parents,
                children: n.children,
            })
            .collect();
        let edges = self
            .edges()
            .filter(|(_, _, e)| e.is_rendered)
            .map(|(from, to, e)| RenderEdge {
                source: from.clone(),
                target: to.clone(),
                edge_type: e.edge_type,
            })
            .collect();
        RenderView {
            person_of_interest: self.person_of_interest().cloned(),
            nodes,
            edges,
        }
    }

    /// Plain-text relationship summary of at most `limit` members.
    #[must_use]
    pub fn summary_text(&self, limit: usize) -> String {
        let mut out = String::new();
        for (id, node) in self.nodes.iter().take(limit) {
            let mut parts = Vec::new();
            for (edge_type, verb) in [
                (EdgeType::Spouse, "married to"),
                (EdgeType::ParentToChild, "has child"),
                (EdgeType::ChildToParent, "has parent"),
            ] {
                for other in self.targets(id, edge_type) {
                    let name = self.member(&other).map_or("?", |m| m.name.as_str());
                    parts.push(format!("{} {} whose ID is {}", verb, name, other));
                }
            }
            out.push_str(&format!(
                "- {} (ID: {}) Relationships= [{}]\n",
                node.member.name,
                id,
                parts.join("; ")
            ));
        }
        if self.nodes.len() > limit {
            out.push_str(&format!("... and {} more\n", self.nodes.len() - limit));
        }
        out
    }
}

/// Snapshot consumed by an external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderView {
    pub person_of_interest: Option<MemberId>,
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode {
    pub id: MemberId,
    pub label: String,
    pub gender: Gender,
    pub alive: bool,
    pub is_poi: bool,
    pub is_visible: bool,
    pub spouses: Visibility,
    pub parents: Visibility,
    pub children: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEdge {
    pub source: MemberId,
    pub target: MemberId,
    pub edge_type: EdgeType,
}

// =============================================================================
// TESTS
// =============================================================================
