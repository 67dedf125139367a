//! # Entity Store
//!
//! The canonical, serializable family-tree records: members, per-member
//! relationship lists and family units. Plain data; all behavior lives in
//! [`crate::graph`] and the engines built on it.

use crate::types::{FamilyUnit, FamilyUnitId, Member, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outgoing relationship lists of one member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub children_ids: Vec<MemberId>,
    #[serde(default)]
    pub spouse_ids: Vec<MemberId>,
    #[serde(default)]
    pub parent_ids: Vec<MemberId>,
}

impl Relationships {
    /// Returns `true` when all three lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children_ids.is_empty() && self.spouse_ids.is_empty() && self.parent_ids.is_empty()
    }

    /// Every listed id, in children, spouse, parent order.
    pub fn all_ids(&self) -> impl Iterator<Item = &MemberId> {
        self.children_ids
            .iter()
            .chain(self.spouse_ids.iter())
            .chain(self.parent_ids.iter())
    }

    /// Append ids from `other` that are not already listed.
    pub fn union_with(&mut self, other: &Relationships) {
        push_missing(&mut self.children_ids, &other.children_ids);
        push_missing(&mut self.spouse_ids, &other.spouse_ids);
        push_missing(&mut self.parent_ids, &other.parent_ids);
    }
}

pub(crate) fn push_missing(into: &mut Vec<MemberId>, from: &[MemberId]) {
    for id in from {
        if !into.contains(id) {
            into.push(id.clone());
        }
    }
}

/// A whole family tree as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStore {
    #[serde(default)]
    pub members: BTreeMap<MemberId, Member>,
    #[serde(default)]
    pub relationships: BTreeMap<MemberId, Relationships>,
    #[serde(default)]
    pub family_units: BTreeMap<FamilyUnitId, FamilyUnit>,
    /// Focus of the last session, restored on load.
    #[serde(default)]
    pub person_of_interest: Option<MemberId>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member keyed by its own id, replacing any previous record.
    pub fn insert_member(&mut self, member: Member) {
        self.members.insert(member.id.clone(), member);
    }

    /// Relationship lists of `id`, or an empty set when none are stored.
    #[must_use]
    pub fn relationships_of(&self, id: &MemberId) -> Relationships {
        self.relationships.get(id).cloned().unwrap_or_default()
    }

    /// Mutable relationship lists of `id`, created on first access.
    pub fn relationships_mut(&mut self, id: &MemberId) -> &mut Relationships {
        self.relationships.entry(id.clone()).or_default()
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of listed relationship ids across every member.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relationships.values().map(|r| r.all_ids().count()).sum()
    }
}
