//! # Family Units
//!
//! Household bookkeeping kept alongside the edges of a [`Graph`].
//!
//! A member's *acquired* family is the unit it heads as a parent, its
//! *birth* family the unit it belongs to as a child. Units follow the
//! edges: a child edge files the child under the parent's unit, a spouse
//! edge puts both spouses at the head of one shared unit.
//!
//! Unit ids are allocated from a counter (`FUNT-0001`, ...) so that unit
//! creation is reproducible for a fixed sequence of edits.

use crate::graph::Graph;
use crate::primitives::FAMILY_UNIT_PREFIX;
use crate::types::{EdgeType, FamilyUnit, FamilyUnitId, MemberId};
use std::collections::BTreeMap;
use tracing::{debug, warn};

impl Graph {
    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Iterate every family unit in id order.
    pub fn family_units(&self) -> impl Iterator<Item = &FamilyUnit> {
        self.family_units.values()
    }

    #[must_use]
    pub fn family_unit(&self, id: &FamilyUnitId) -> Option<&FamilyUnit> {
        self.family_units.get(id)
    }

    /// The unit `member` heads as a parent.
    #[must_use]
    pub fn acquired_family(&self, member: &MemberId) -> Option<&FamilyUnit> {
        self.node(member)
            .and_then(|n| n.acquired_family.as_ref())
            .and_then(|u| self.family_units.get(u))
    }

    /// The unit `member` was born into.
    #[must_use]
    pub fn birth_family(&self, member: &MemberId) -> Option<&FamilyUnit> {
        self.node(member)
            .and_then(|n| n.birth_family.as_ref())
            .and_then(|u| self.family_units.get(u))
    }

    fn acquired_id(&self, member: &MemberId) -> Option<FamilyUnitId> {
        self.node(member).and_then(|n| n.acquired_family.clone())
    }

    // =========================================================================
    // EDGE HOOKS
    // =========================================================================

    /// File `child` under the unit headed by `parent`.
    pub(crate) fn note_child_link(&mut self, parent: &MemberId, child: &MemberId) {
        let unit_id = match self.acquired_id(parent) {
            Some(unit_id) => unit_id,
            None => self.create_unit(vec![parent.clone()]),
        };
        if let Some(unit) = self.family_units.get_mut(&unit_id) {
            if !unit.child_ids.contains(child) {
                unit.child_ids.push(child.clone());
            }
        }
        if let Some(node) = self.node_mut(child) {
            if node.birth_family.is_none() {
                node.birth_family = Some(unit_id);
            }
        }
    }

    /// Put `a` and `b` at the head of one shared unit.
    pub(crate) fn note_spouse_link(&mut self, a: &MemberId, b: &MemberId) {
        match (self.acquired_id(a), self.acquired_id(b)) {
            (None, None) => {
                self.create_unit(vec![a.clone(), b.clone()]);
            }
            (Some(unit), None) => self.join_as_parent(&unit, b),
            (None, Some(unit)) => self.join_as_parent(&unit, a),
            (Some(ua), Some(ub)) if ua == ub => {}
            (Some(ua), Some(ub)) => {
                if self.headed_only_by(&ub, b) {
                    self.fold_units(&ua, &ub);
                } else if self.headed_only_by(&ua, a) {
                    self.fold_units(&ub, &ua);
                } else {
                    debug!(%a, %b, "both spouses already head shared units; left apart");
                }
            }
        }
    }

    /// Detach `child` from `parent`'s unit once no parent of that unit is
    /// linked to it any more.
    pub(crate) fn note_child_unlink(&mut self, parent: &MemberId, child: &MemberId) {
        let Some(unit_id) = self.acquired_id(parent) else {
            return;
        };
        let Some(unit) = self.family_units.get(&unit_id) else {
            return;
        };
        let still_linked = unit.parent_ids.iter().any(|p| {
            self.has_edge_of(p, child, EdgeType::ParentToChild)
                || self.has_edge_of(child, p, EdgeType::ChildToParent)
        });
        if still_linked {
            return;
        }
        if let Some(unit) = self.family_units.get_mut(&unit_id) {
            unit.child_ids.retain(|c| c != child);
        }
        if let Some(node) = self.node_mut(child) {
            if node.birth_family.as_ref() == Some(&unit_id) {
                node.birth_family = None;
            }
        }
    }

    /// Remove `member` from every unit and drop units left empty.
    pub(crate) fn detach_from_family_units(&mut self, member: &MemberId) {
        let mut emptied = Vec::new();
        let mut renamed = Vec::new();
        for (id, unit) in &mut self.family_units {
            let parents_before = unit.parent_ids.len();
            unit.parent_ids.retain(|p| p != member);
            unit.child_ids.retain(|c| c != member);
            if unit.is_empty() {
                emptied.push(id.clone());
            } else if unit.parent_ids.len() != parents_before {
                renamed.push(id.clone());
            }
        }
        for id in &renamed {
            self.rename_unit(id);
        }
        for id in emptied {
            self.family_units.remove(&id);
            self.clear_pointers_to(&id);
            debug!(unit = %id, "empty family unit dropped");
        }
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Adopt a stored unit, dropping references to unknown members.
    pub(crate) fn load_family_unit(&mut self, unit: &FamilyUnit) {
        let mut loaded = unit.clone();
        loaded.parent_ids.retain(|p| self.contains_member(p));
        loaded.child_ids.retain(|c| self.contains_member(c));
        let dropped = unit.parent_ids.len() + unit.child_ids.len()
            - loaded.parent_ids.len()
            - loaded.child_ids.len();
        if dropped > 0 {
            warn!(unit = %unit.id, dropped, "family unit references unknown members");
        }
        for parent in &loaded.parent_ids {
            if let Some(node) = self.node_mut(parent) {
                if node.acquired_family.is_none() {
                    node.acquired_family = Some(loaded.id.clone());
                }
            }
        }
        for child in &loaded.child_ids {
            if let Some(node) = self.node_mut(child) {
                if node.birth_family.is_none() {
                    node.birth_family = Some(loaded.id.clone());
                }
            }
        }
        self.family_units.insert(loaded.id.clone(), loaded);
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn create_unit(&mut self, parents: Vec<MemberId>) -> FamilyUnitId {
        let id = free_unit_id(&self.family_units);
        for parent in &parents {
            if let Some(node) = self.node_mut(parent) {
                node.acquired_family = Some(id.clone());
            }
        }
        let mut unit = FamilyUnit::new(id.clone());
        unit.parent_ids = parents;
        self.family_units.insert(id.clone(), unit);
        self.rename_unit(&id);
        debug!(unit = %id, "family unit created");
        id
    }

    fn join_as_parent(&mut self, unit_id: &FamilyUnitId, member: &MemberId) {
        if let Some(unit) = self.family_units.get_mut(unit_id) {
            if !unit.parent_ids.contains(member) {
                unit.parent_ids.push(member.clone());
            }
        }
        if let Some(node) = self.node_mut(member) {
            node.acquired_family = Some(unit_id.clone());
        }
        self.rename_unit(unit_id);
    }

    fn headed_only_by(&self, unit_id: &FamilyUnitId, member: &MemberId) -> bool {
        self.family_units
            .get(unit_id)
            .is_some_and(|u| u.parent_ids.iter().all(|p| p == member))
    }

    /// Move everything from `absorb` into `keep` and drop `absorb`.
    fn fold_units(&mut self, keep: &FamilyUnitId, absorb: &FamilyUnitId) {
        let Some(absorbed) = self.family_units.remove(absorb) else {
            return;
        };
        if let Some(unit) = self.family_units.get_mut(keep) {
            crate::store::push_missing(&mut unit.parent_ids, &absorbed.parent_ids);
            crate::store::push_missing(&mut unit.child_ids, &absorbed.child_ids);
        }
        for member in absorbed.parent_ids.iter().chain(absorbed.child_ids.iter()) {
            if let Some(node) = self.node_mut(member) {
                if node.acquired_family.as_ref() == Some(absorb) {
                    node.acquired_family = Some(keep.clone());
                }
                if node.birth_family.as_ref() == Some(absorb) {
                    node.birth_family = Some(keep.clone());
                }
            }
        }
        self.rename_unit(keep);
        debug!(%keep, %absorb, "family units folded");
    }

    fn clear_pointers_to(&mut self, unit_id: &FamilyUnitId) {
        let ids: Vec<MemberId> = self.member_ids().cloned().collect();
        for id in ids {
            if let Some(node) = self.node_mut(&id) {
                if node.acquired_family.as_ref() == Some(unit_id) {
                    node.acquired_family = None;
                }
                if node.birth_family.as_ref() == Some(unit_id) {
                    node.birth_family = None;
                }
            }
        }
    }

    fn rename_unit(&mut self, unit_id: &FamilyUnitId) {
        let Some(unit) = self.family_units.get(unit_id) else {
            return;
        };
        let names: Vec<String> = unit
            .parent_ids
            .iter()
            .map(|p| {
                self.member(p)
                    .map_or_else(|| p.to_string(), |m| m.name.clone())
            })
            .collect();
        let name = unit_name(&names);
        if let Some(unit) = self.family_units.get_mut(unit_id) {
            unit.name = name;
        }
    }
}

/// First free id of the form `FUNT-0001`.
pub(crate) fn free_unit_id(units: &BTreeMap<FamilyUnitId, FamilyUnit>) -> FamilyUnitId {
    let mut n = units.len() + 1;
    loop {
        let candidate = FamilyUnitId::new(format!("{}-{:04}", FAMILY_UNIT_PREFIX, n));
        if !units.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// "A's family", "A's and B's family", "A's, B's and C's family".
fn unit_name(parent_names: &[String]) -> String {
    let possessives: Vec<String> = parent_names.iter().map(|n| format!("{}'s", n)).collect();
    match possessives.as_slice() {
        [] => "Family".to_string(),
        [only] => format!("{} family", only),
        [init @ .., last] => format!("{} and {} family", init.join(", "), last),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Member;

    fn id(s: &str) -> MemberId {
        MemberId::from(s)
    }

    fn graph_with(members: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for (m, name) in members {
            graph.add_member(Member::new(*m, *name)).expect("add");
        }
        graph
    }

    #[test]
    fn unit_names() {
        assert_eq!(unit_name(&[]), "Family");
        assert_eq!(unit_name(&["Arthur".to_string()]), "Arthur's family");
        assert_eq!(
            unit_name(&["Arthur".to_string(), "Molly".to_string()]),
            "Arthur's and Molly's family"
        );
        assert_eq!(
            unit_name(&["A".to_string(), "B".to_string(), "C".to_string()]),
            "A's, B's and C's family"
        );
    }

    #[test]
    fn child_edge_creates_parent_unit() {
        let mut graph = graph_with(&[("P", "Parent"), ("C", "Child")]);
        graph.add_child_relation(&id("P"), &id("C")).expect("child");

        let unit = graph.acquired_family(&id("P")).expect("unit");
        assert_eq!(unit.name, "Parent's family");
        assert_eq!(unit.parent_ids, vec![id("P")]);
        assert_eq!(unit.child_ids, vec![id("C")]);
        assert_eq!(graph.birth_family(&id("C")).map(|u| &u.id), Some(&unit.id));
    }

    #[test]
    fn spouse_edges_share_one_unit() {
        let mut graph = graph_with(&[("S1", "Spouse1"), ("S2", "Spouse2")]);
        graph.add_spouse_relation(&id("S1"), &id("S2")).expect("s1-s2");
        graph.add_spouse_relation(&id("S2"), &id("S1")).expect("s2-s1");

        assert_eq!(graph.family_units().count(), 1);
        let unit = graph.acquired_family(&id("S1")).expect("unit");
        assert_eq!(unit.name, "Spouse1's and Spouse2's family");
        assert_eq!(unit.parent_ids, vec![id("S1"), id("S2")]);
    }

    #[test]
    fn spouse_edge_folds_single_parent_units() {
        let mut graph = graph_with(&[("A", "A"), ("B", "B"), ("C", "C")]);
        graph.add_child_relation(&id("A"), &id("C")).expect("a-c");
        graph.add_child_relation(&id("B"), &id("C")).expect("b-c");
        assert_eq!(graph.family_units().count(), 2);

        graph.add_spouse_relation(&id("A"), &id("B")).expect("a-b");

        assert_eq!(graph.family_units().count(), 1);
        let unit = graph.acquired_family(&id("B")).expect("unit");
        assert_eq!(unit.child_ids, vec![id("C")]);
        assert_eq!(graph.birth_family(&id("C")).map(|u| &u.id), Some(&unit.id));
    }

    #[test]
    fn removing_member_prunes_units() {
        let mut graph = graph_with(&[("P", "P"), ("C", "C")]);
        graph.add_child_relation(&id("P"), &id("C")).expect("child");
        graph.remove_member(&id("C")).expect("remove child");
        assert_eq!(
            graph.acquired_family(&id("P")).map(|u| u.child_ids.len()),
            Some(0)
        );
        graph.remove_member(&id("P")).expect("remove parent");
        assert_eq!(graph.family_units().count(), 0);
    }

    #[test]
    fn unlinking_child_detaches_from_unit() {
        let mut graph = graph_with(&[("P", "P"), ("C", "C")]);
        graph.add_child_relation(&id("P"), &id("C")).expect("p-c");
        graph.add_parent_relation(&id("C"), &id("P")).expect("c-p");

        graph.remove_edge(&id("P"), &id("C"));
        assert!(graph.birth_family(&id("C")).is_some());
        graph.remove_edge(&id("C"), &id("P"));
        assert!(graph.birth_family(&id("C")).is_none());
    }

    #[test]
    fn unit_ids_are_sequential() {
        let mut graph = graph_with(&[("A", "A"), ("B", "B"), ("C", "C"), ("D", "D")]);
        graph.add_child_relation(&id("A"), &id("B")).expect("a-b");
        graph.add_child_relation(&id("C"), &id("D")).expect("c-d");
        let ids: Vec<&str> = graph.family_units().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["FUNT-0001", "FUNT-0002"]);
    }
}
