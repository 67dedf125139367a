//! # Tree Reconciliation
//!
//! Merges an incoming tree into a base tree, unifying members that
//! plausibly are the same person.
//!
//! ## Scoring (per-mille, integer only)
//!
//! ```text
//! base     = (name + gender + birth_year) / (1000 + applicable bonuses)
//! neighbor = mean name similarity over (parent, parent), (child, child),
//!            (spouse, spouse) pairs
//! final    = base + neighbor * 20 / 100
//! ```
//!
//! Names score 0..=1000; gender and birth year each add 200 when both sides
//! know the value and 200 more to the achievable total. The neighbor bonus
//! amplifies a match but cannot establish one on its own.
//!
//! A candidate is merged when its final score strictly exceeds the threshold
//! (800). Candidates are scanned in id order and the first strictly-highest
//! score wins, so equal scores resolve to the smallest id.

use crate::family::free_unit_id;
use crate::ids::{IdGenerator, generate_unique};
use crate::primitives::{
    BIRTH_YEAR_MATCH_POINTS, GENDER_MATCH_POINTS, MATCH_THRESHOLD_PER_MILLE,
    NEIGHBOR_WEIGHT_PERCENT, SCORE_SCALE,
};
use crate::similarity::{Similarity, name_similarity};
use crate::store::{EntityStore, Relationships, push_missing};
use crate::types::{FamilyUnit, Member, MemberId, StemmaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunable weights of the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Final score (per-mille) a match must strictly exceed.
    pub threshold_per_mille: u32,
    /// Share of the neighbor score added to the base score.
    pub neighbor_weight_percent: u32,
    /// Bonus for equal known genders, on the 0..=100 name scale.
    pub gender_points: u32,
    /// Bonus for equal known birth years, on the 0..=100 name scale.
    pub birth_year_points: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            threshold_per_mille: MATCH_THRESHOLD_PER_MILLE,
            neighbor_weight_percent: NEIGHBOR_WEIGHT_PERCENT,
            gender_points: GENDER_MATCH_POINTS,
            birth_year_points: BIRTH_YEAR_MATCH_POINTS,
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// An incoming member unified with an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMatch {
    pub incoming: MemberId,
    pub matched: MemberId,
    pub score_per_mille: u32,
}

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub matched: Vec<MemberMatch>,
    /// Ids assigned to incoming members copied in as new.
    pub added: Vec<MemberId>,
    /// Incoming id to merged-tree id, for every incoming member.
    pub id_map: BTreeMap<MemberId, MemberId>,
    /// Incoming relationship sources that had no mapping.
    pub skipped_sources: Vec<MemberId>,
}

/// The merged tree and its report.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub store: EntityStore,
    pub report: MergeReport,
}

// =============================================================================
// MERGER
// =============================================================================

/// Reconciles two trees using a pluggable name scorer.
pub struct TreeMerger<'a, S: Similarity + ?Sized> {
    scorer: &'a S,
    config: ReconcileConfig,
}

impl<'a, S: Similarity + ?Sized> TreeMerger<'a, S> {
    #[must_use]
    pub fn new(scorer: &'a S, config: ReconcileConfig) -> Self {
        Self { scorer, config }
    }

    /// Attribute similarity of two members, per-mille.
    #[must_use]
    pub fn base_score(&self, m1: &Member, m2: &Member) -> u32 {
        let mut earned = name_similarity(self.scorer, &m1.all_names(), &m2.all_names());
        let mut possible = SCORE_SCALE;

        // points are on the 0..=100 name scale; oversized weights saturate
        let gender_bonus = self.config.gender_points.saturating_mul(10);
        if m1.gender.is_known() && m2.gender.is_known() {
            possible = possible.saturating_add(gender_bonus);
            if m1.gender == m2.gender {
                earned = earned.saturating_add(gender_bonus);
            }
        }
        let year_bonus = self.config.birth_year_points.saturating_mul(10);
        if let (Some(y1), Some(y2)) = (m1.birth_year(), m2.birth_year()) {
            possible = possible.saturating_add(year_bonus);
            if y1 == y2 {
                earned = earned.saturating_add(year_bonus);
            }
        }
        let scaled = u64::from(earned) * u64::from(SCORE_SCALE) / u64::from(possible);
        u32::try_from(scaled).unwrap_or(SCORE_SCALE)
    }

    /// Mean name similarity of same-role neighbors, per-mille.
    ///
    /// 0 when either side has no comparable neighbor.
    #[must_use]
    pub fn neighbor_score(
        &self,
        m1: &MemberId,
        tree1: &EntityStore,
        m2: &MemberId,
        tree2: &EntityStore,
    ) -> u32 {
        let r1 = tree1.relationships_of(m1);
        let r2 = tree2.relationships_of(m2);
        let mut total = 0u32;
        let mut pairs = 0u32;
        for (list1, list2) in [
            (&r1.parent_ids, &r2.parent_ids),
            (&r1.children_ids, &r2.children_ids),
            (&r1.spouse_ids, &r2.spouse_ids),
        ] {
            for n1 in list1.iter().filter_map(|id| tree1.members.get(id)) {
                for n2 in list2.iter().filter_map(|id| tree2.members.get(id)) {
                    let score = name_similarity(self.scorer, &n1.all_names(), &n2.all_names());
                    total = total.saturating_add(score);
                    pairs = pairs.saturating_add(1);
                }
            }
        }
        if pairs == 0 { 0 } else { total / pairs }
    }

    /// Base score plus the weighted neighbor bonus, per-mille.
    #[must_use]
    pub fn final_score(
        &self,
        m1: &Member,
        tree1: &EntityStore,
        m2: &Member,
        tree2: &EntityStore,
    ) -> u32 {
        let base = self.base_score(m1, m2);
        let neighbor = self.neighbor_score(&m1.id, tree1, &m2.id, tree2);
        base.saturating_add(neighbor.saturating_mul(self.config.neighbor_weight_percent) / 100)
    }

    /// Merge `incoming` into a copy of `base`.
    ///
    /// Members are processed in id order against the growing merged tree.
    /// Relationships and family units are re-keyed afterwards.
    pub fn merge<G: IdGenerator + ?Sized>(
        &self,
        base: &EntityStore,
        incoming: &EntityStore,
        ids: &mut G,
    ) -> Result<MergeOutcome, StemmaError> {
        let mut merged = base.clone();
        let mut report = MergeReport::default();

        for (incoming_id, m2) in &incoming.members {
            let mut best: Option<(MemberId, u32)> = None;
            for (candidate_id, m1) in &merged.members {
                let score = self.final_score(m1, &merged, m2, incoming);
                if best.as_ref().is_none_or(|(_, top)| score > *top) {
                    best = Some((candidate_id.clone(), score));
                }
            }

            match best {
                Some((matched, score)) if score > self.config.threshold_per_mille => {
                    if let Some(target) = merged.members.get_mut(&matched) {
                        merge_member_fields(target, m2);
                    }
                    debug!(incoming = %incoming_id, %matched, score, "member unified");
                    report.id_map.insert(incoming_id.clone(), matched.clone());
                    report.matched.push(MemberMatch {
                        incoming: incoming_id.clone(),
                        matched,
                        score_per_mille: score,
                    });
                }
                _ => {
                    let new_id = generate_unique(ids, |c| merged.members.contains_key(c))?;
                    let mut copy = m2.clone();
                    copy.id = new_id.clone();
                    merged.insert_member(copy);
                    debug!(incoming = %incoming_id, %new_id, "member added");
                    report.id_map.insert(incoming_id.clone(), new_id.clone());
                    report.added.push(new_id);
                }
            }
        }

        for (source, rels) in &incoming.relationships {
            let Some(mapped_source) = report.id_map.get(source).cloned() else {
                warn!(%source, "incoming relationships for unmapped member skipped");
                report.skipped_sources.push(source.clone());
                continue;
            };
            let rekeyed = Relationships {
                children_ids: rekey(&rels.children_ids, &report.id_map, Some(&mapped_source)),
                spouse_ids: rekey(&rels.spouse_ids, &report.id_map, Some(&mapped_source)),
                parent_ids: rekey(&rels.parent_ids, &report.id_map, Some(&mapped_source)),
            };
            merged.relationships_mut(&mapped_source).union_with(&rekeyed);
        }

        for unit in incoming.family_units.values() {
            let parents = rekey(&unit.parent_ids, &report.id_map, None);
            let children = rekey(&unit.child_ids, &report.id_map, None);
            let shared = merged
                .family_units
                .values_mut()
                .find(|u| u.parent_ids.iter().any(|p| parents.contains(p)));
            if let Some(existing) = shared {
                push_missing(&mut existing.parent_ids, &parents);
                push_missing(&mut existing.child_ids, &children);
                continue;
            }
            let id = if merged.family_units.contains_key(&unit.id) {
                free_unit_id(&merged.family_units)
            } else {
                unit.id.clone()
            };
            merged.family_units.insert(
                id.clone(),
                FamilyUnit {
                    id,
                    name: unit.name.clone(),
                    parent_ids: parents,
                    child_ids: children,
                },
            );
        }

        info!(
            matched = report.matched.len(),
            added = report.added.len(),
            skipped = report.skipped_sources.len(),
            "trees merged"
        );
        Ok(MergeOutcome {
            store: merged,
            report,
        })
    }
}

/// Map ids through `id_map`, dropping unmapped ids and `exclude`.
fn rekey(
    ids: &[MemberId],
    id_map: &BTreeMap<MemberId, MemberId>,
    exclude: Option<&MemberId>,
) -> Vec<MemberId> {
    let mut out = Vec::new();
    for id in ids {
        match id_map.get(id) {
            Some(mapped) if Some(mapped) == exclude => {}
            Some(mapped) => {
                if !out.contains(mapped) {
                    out.push(mapped.clone());
                }
            }
            None => warn!(member_id = %id, "incoming reference to unmapped member dropped"),
        }
    }
    out
}

/// Field-level merge of `source` into `target`.
///
/// - singular fields are overwritten when `source` records a value
/// - nicknames are unioned without duplicates
/// - attributes are overwritten key by key
/// - the id of `target` never changes
pub fn merge_member_fields(target: &mut Member, source: &Member) {
    if !source.name.trim().is_empty() {
        target.name = source.name.clone();
    }
    for nickname in &source.nicknames {
        if !target.nicknames.contains(nickname) {
            target.nicknames.push(nickname.clone());
        }
    }
    if source.gender.is_known() {
        target.gender = source.gender;
    }
    if source.alive.is_some() {
        target.alive = source.alive;
    }
    if source.date_of_birth.is_some() {
        target.date_of_birth = source.date_of_birth;
    }
    if source.date_of_death.is_some() {
        target.date_of_death = source.date_of_death;
    }
    if source.wedding_date.is_some() {
        target.wedding_date = source.wedding_date;
    }
    if source.traditional_date_of_birth.is_some() {
        target.traditional_date_of_birth = source.traditional_date_of_birth;
    }
    if source.traditional_date_of_death.is_some() {
        target.traditional_date_of_death = source.traditional_date_of_death;
    }
    for (key, value) in &source.additional_info {
        target.additional_info.insert(key.clone(), value.clone());
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIdGenerator;
    use crate::similarity::TokenSetRatio;
    use crate::types::{Gender, GregorianDate, Paksham, TamilMonth, TraditionalDate};

    fn john(id: &str) -> Member {
        Member::new(id, "John Smith")
            .with_gender(Gender::Male)
            .with_birth(GregorianDate::new(1980, 5, 17))
    }

    fn tree(members: Vec<Member>) -> EntityStore {
        let mut store = EntityStore::new();
        for m in members {
            store.insert_member(m);
        }
        store
    }

    fn merger() -> TreeMerger<'static, TokenSetRatio> {
        TreeMerger::new(&TokenSetRatio, ReconcileConfig::default())
    }

    #[test]
    fn identical_members_score_full() {
        let m = merger();
        assert_eq!(m.base_score(&john("A"), &john("B")), 1000);
    }

    #[test]
    fn gender_mismatch_lowers_score() {
        let m = merger();
        let other = john("B").with_gender(Gender::Female);
        // 1000 + 0 + 200 of 1400
        assert_eq!(m.base_score(&john("A"), &other), 857);
    }

    #[test]
    fn unknown_attributes_do_not_count() {
        let m = merger();
        let a = Member::new("A", "John Smith");
        assert_eq!(m.base_score(&a, &john("B")), 1000);
    }

    #[test]
    fn oversized_weights_saturate() {
        let config = ReconcileConfig {
            threshold_per_mille: u32::MAX,
            neighbor_weight_percent: u32::MAX,
            gender_points: u32::MAX,
            birth_year_points: u32::MAX,
        };
        let m = TreeMerger::new(&TokenSetRatio, config);
        assert_eq!(m.base_score(&john("A"), &john("B")), 1000);

        let mut left = tree(vec![john("A"), Member::new("PA", "Mary Smith")]);
        left
            .relationships_mut(&MemberId::from("A"))
            .parent_ids
            .push(MemberId::from("PA"));
        let mut right = tree(vec![john("B"), Member::new("PB", "Mary Smith")]);
        right
            .relationships_mut(&MemberId::from("B"))
            .parent_ids
            .push(MemberId::from("PB"));
        let score = m.final_score(&john("A"), &left, &john("B"), &right);
        assert_eq!(score, 1000 + u32::MAX / 100);
    }

    #[test]
    fn same_john_smith_merges_into_one() {
        let base = tree(vec![john("J1")]);
        let incoming = tree(vec![john("X9")]);
        let mut ids = SequentialIdGenerator::new("N");

        let outcome = merger().merge(&base, &incoming, &mut ids).expect("merge");

        assert_eq!(outcome.store.members.len(), 1);
        assert_eq!(outcome.report.matched.len(), 1);
        assert_eq!(outcome.report.matched[0].score_per_mille, 1000);
        assert_eq!(
            outcome.report.id_map.get(&MemberId::from("X9")),
            Some(&MemberId::from("J1"))
        );
    }

    #[test]
    fn unrelated_members_stay_apart() {
        let base = tree(vec![Member::new("A", "Xu")]);
        let incoming = tree(vec![Member::new("B", "Bob")]);
        let mut ids = SequentialIdGenerator::new("N");

        let outcome = merger().merge(&base, &incoming, &mut ids).expect("merge");

        assert_eq!(outcome.store.members.len(), 2);
        assert_eq!(outcome.report.added, vec![MemberId::from("N0001")]);
        assert!(outcome.store.members.contains_key(&MemberId::from("N0001")));
    }

    #[test]
    fn merge_into_empty_tree_is_additive() {
        let incoming = tree(vec![john("A"), Member::new("B", "Mary Jones")]);
        let mut ids = SequentialIdGenerator::new("N");
        let outcome = merger()
            .merge(&EntityStore::new(), &incoming, &mut ids)
            .expect("merge");
        assert_eq!(outcome.store.members.len(), 2);
        assert!(outcome.report.matched.is_empty());
    }

    #[test]
    fn neighbor_bonus_needs_neighbors_on_both_sides() {
        let mut base = tree(vec![john("J1"), Member::new("P1", "Robert Smith")]);
        base.relationships_mut(&MemberId::from("J1"))
            .parent_ids
            .push(MemberId::from("P1"));
        let mut incoming = tree(vec![john("J2"), Member::new("P2", "Robert Smith")]);
        incoming
            .relationships_mut(&MemberId::from("J2"))
            .parent_ids
            .push(MemberId::from("P2"));

        let m = merger();
        assert_eq!(
            m.neighbor_score(&MemberId::from("J1"), &base, &MemberId::from("J2"), &incoming),
            1000
        );
        assert_eq!(
            m.final_score(&john("J1"), &base, &john("J2"), &incoming),
            1200
        );
        assert_eq!(
            m.neighbor_score(
                &MemberId::from("J1"),
                &base,
                &MemberId::from("J2"),
                &EntityStore::new()
            ),
            0
        );
    }

    #[test]
    fn relationships_are_rekeyed() {
        let base = tree(vec![john("J1")]);
        let mut incoming = tree(vec![john("J2"), Member::new("K", "Kid Smith")]);
        incoming
            .relationships_mut(&MemberId::from("J2"))
            .children_ids
            .push(MemberId::from("K"));
        incoming
            .relationships_mut(&MemberId::from("GHOST"))
            .spouse_ids
            .push(MemberId::from("J2"));
        let mut ids = SequentialIdGenerator::new("N");

        let outcome = merger().merge(&base, &incoming, &mut ids).expect("merge");

        let kid = outcome
            .report
            .id_map
            .get(&MemberId::from("K"))
            .cloned()
            .expect("kid mapped");
        assert_eq!(
            outcome.store.relationships_of(&MemberId::from("J1")).children_ids,
            vec![kid]
        );
        assert_eq!(outcome.report.skipped_sources, vec![MemberId::from("GHOST")]);
    }

    #[test]
    fn field_merge_unions_and_overwrites() {
        let mut target = john("J1").with_nickname("Johnny");
        target
            .additional_info
            .insert("image_location".into(), "old.png".into());
        let mut source = Member::new("J2", "John A. Smith").with_nickname("Johnny");
        source.nicknames.push("Jack".into());
        source.alive = Some(false);
        source
            .additional_info
            .insert("image_location".into(), "new.png".into());

        merge_member_fields(&mut target, &source);

        assert_eq!(target.id, MemberId::from("J1"));
        assert_eq!(target.name, "John A. Smith");
        assert_eq!(target.nicknames, vec!["Johnny".to_string(), "Jack".to_string()]);
        assert_eq!(target.gender, Gender::Male);
        assert_eq!(target.birth_year(), Some(1980));
        assert_eq!(target.alive, Some(false));
        assert_eq!(
            target.additional_info.get("image_location").map(String::as_str),
            Some("new.png")
        );
    }

    #[test]
    fn field_merge_carries_traditional_dates() {
        let birth = TraditionalDate {
            month: Some(TamilMonth::Chithirai),
            ..TraditionalDate::default()
        };
        let mut target = john("J1");
        target.traditional_date_of_birth = Some(birth);
        let mut source = john("J2");
        source.traditional_date_of_death = Some(TraditionalDate {
            month: Some(TamilMonth::Maasi),
            paksham: Some(Paksham::Shukla),
            ..TraditionalDate::default()
        });

        merge_member_fields(&mut target, &source);

        assert_eq!(target.traditional_date_of_birth, Some(birth));
        assert_eq!(
            target.traditional_date_of_death.and_then(|d| d.paksham),
            Some(Paksham::Shukla)
        );
    }

    #[test]
    fn family_units_fold_into_shared_parent_unit() {
        let mut base = tree(vec![john("J1")]);
        let mut unit = FamilyUnit::new(crate::types::FamilyUnitId::new("FUNT-0001"));
        unit.parent_ids.push(MemberId::from("J1"));
        base.family_units.insert(unit.id.clone(), unit);

        let mut incoming = tree(vec![john("J2"), Member::new("K", "Kid Smith")]);
        let mut unit = FamilyUnit::new(crate::types::FamilyUnitId::new("FUNT-0001"));
        unit.parent_ids.push(MemberId::from("J2"));
        unit.child_ids.push(MemberId::from("K"));
        incoming.family_units.insert(unit.id.clone(), unit);
        let mut ids = SequentialIdGenerator::new("N");

        let outcome = merger().merge(&base, &incoming, &mut ids).expect("merge");

        assert_eq!(outcome.store.family_units.len(), 1);
        let merged_unit = outcome.store.family_units.values().next().expect("unit");
        assert_eq!(merged_unit.child_ids, vec![MemberId::from("N0001")]);
    }
}
