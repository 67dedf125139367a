//! # Scenario Tests
//!
//! End-to-end family-tree scenarios through the public API.

use stemma_core::{
    EdgeType, EntityStore, Gender, Graph, GregorianDate, Member, MemberDraft, MemberId,
    MutationEngine, ReconcileConfig, RelationshipOutcome, SequentialIdGenerator, StemmaError,
    TokenSetRatio, TreeMerger, TreeSession,
};

fn id(s: &str) -> MemberId {
    MemberId::from(s)
}

fn person(key: &str, name: &str, gender: Gender, birth: (i32, u32, u32)) -> Member {
    Member::new(key, name)
        .with_gender(gender)
        .with_birth(GregorianDate::new(birth.0, birth.1, birth.2))
}

fn graph_with(ids: &[&str]) -> Graph {
    let mut graph = Graph::new();
    for key in ids {
        graph.add_member(Member::new(*key, *key)).expect("add");
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

const CHILDREN: [(&str, &str, Gender, (i32, u32, u32)); 7] = [
    ("BILLW", "Bill Weasley", Gender::Male, (1970, 11, 29)),
    ("CHARW", "Charlie Weasley", Gender::Male, (1972, 12, 12)),
    ("PERCW", "Percy Weasley", Gender::Male, (1976, 8, 22)),
    ("FREDW", "Fred Weasley", Gender::Male, (1978, 4, 1)),
    ("GEORW", "George Weasley", Gender::Male, (1978, 4, 1)),
    ("RONAW", "Ron Weasley", Gender::Male, (1980, 3, 1)),
    ("GINNW", "Ginny Weasley", Gender::Female, (1981, 8, 11)),
];

/// Arthur and Molly with their seven children, built through inference.
fn weasleys() -> Graph {
    let mut graph = Graph::new();
    graph
        .add_member(person("ARTHW", "Arthur Weasley", Gender::Male, (1950, 2, 6)))
        .expect("arthur");
    graph
        .add_member(
            person("MOLLW", "Molly Weasley", Gender::Female, (1949, 10, 30))
                .with_nickname("Mollywobbles"),
        )
        .expect("molly");
    relate(&mut graph, "ARTHW", "MOLLW", EdgeType::Spouse, true).expect("marriage");

    for (key, name, gender, birth) in CHILDREN {
        let mut child = person(key, name, gender, birth);
        if key == "FREDW" {
            child.alive = Some(false);
            child.date_of_death = Some(GregorianDate::new(1998, 5, 2));
        }
        if key == "RONAW" {
            child = child.with_nickname("Won-Won");
        }
        graph.add_member(child).expect("child");
        MutationEngine::add_relationship(
            &mut graph,
            &id("ARTHW"),
            &id(key),
            EdgeType::ParentToChild,
            true,
        )
        .expect("child link");
    }
    graph
}

// =============================================================================
// WHOLE FAMILY
// =============================================================================

#[test]
fn weasley_family_has_nine_members_and_thirty_edges() {
    let graph = weasleys();

    assert_eq!(graph.node_count(), 9);
    assert_eq!(graph.edge_count(), 30);
    for (key, ..) in CHILDREN {
        assert_eq!(graph.get_parents(&id(key)), vec![id("ARTHW"), id("MOLLW")]);
    }
    assert_eq!(graph.get_children(&id("MOLLW")).len(), 7);

    let units: Vec<_> = graph.family_units().collect();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].parent_ids, vec![id("ARTHW"), id("MOLLW")]);
    assert_eq!(units[0].child_ids.len(), 7);
    assert_eq!(
        graph.birth_family(&id("GINNW")).map(|u| u.id.clone()),
        Some(units[0].id.clone())
    );
}

#[test]
fn weasley_render_view_hides_child_to_parent_edges() {
    let view = weasleys().render_view();
    assert_eq!(view.nodes.len(), 9);
    // one spouse edge and one edge per parent-child pair
    assert_eq!(view.edges.len(), 15);
    assert!(view.edges.iter().all(|e| e.edge_type != EdgeType::ChildToParent));
}

#[test]
fn weasley_tree_survives_save_and_load() {
    let graph = weasleys();
    let store = graph.to_store();
    let reloaded = Graph::from_store(&store).expect("reload");
    assert_eq!(reloaded.to_store(), store);
    assert_eq!(reloaded.edge_count(), 30);
}

// =============================================================================
// INFERENCE
// =============================================================================

#[test]
fn marrying_a_parent_adopts_their_children() {
    let mut graph = graph_with(&["ARTHW", "MOLLW", "BILLW", "CHARW"]);
    for child in ["BILLW", "CHARW"] {
        relate(&mut graph, "ARTHW", child, EdgeType::ParentToChild, true).expect("child");
    }

    let outcome = relate(&mut graph, "MOLLW", "ARTHW", EdgeType::Spouse, true).expect("marriage");

    assert_eq!(outcome.message, "Relationships processed.");
    // spouse pair plus two parent-child pairs
    assert_eq!(outcome.established.len(), 6);
    assert_eq!(graph.get_children(&id("MOLLW")), vec![id("BILLW"), id("CHARW")]);
    assert_eq!(graph.get_parents(&id("CHARW")), vec![id("ARTHW"), id("MOLLW")]);
}

#[test]
fn second_parent_becomes_spouse_and_co_parent() {
    let mut graph = graph_with(&["ARTHW", "MOLLW", "BILLW", "CHARW"]);
    for child in ["BILLW", "CHARW"] {
        relate(&mut graph, "ARTHW", child, EdgeType::ParentToChild, true).expect("child");
    }

    relate(&mut graph, "BILLW", "MOLLW", EdgeType::ChildToParent, true).expect("new parent");

    assert!(graph.has_edge_of(&id("MOLLW"), &id("ARTHW"), EdgeType::Spouse));
    assert!(graph.has_edge_of(&id("ARTHW"), &id("MOLLW"), EdgeType::Spouse));
    assert!(graph.has_edge_of(&id("MOLLW"), &id("CHARW"), EdgeType::ParentToChild));
    assert_eq!(graph.family_units().count(), 1);
}

#[test]
fn third_parent_is_ambiguous() {
    let mut graph = graph_with(&["C", "P1", "P2", "P3"]);
    for parent in ["P1", "P2"] {
        relate(&mut graph, "C", parent, EdgeType::ChildToParent, false).expect("parent");
    }

    let outcome = relate(&mut graph, "C", "P3", EdgeType::ChildToParent, true)
        .expect("third parent");

    assert_eq!(
        outcome.message,
        "Child C has multiple other parents [P1, P2]; no spouse inferred for P3."
    );
    assert!(!graph.has_spouse(&id("P3")));
    assert_eq!(graph.get_parents(&id("C")).len(), 3);
}

#[test]
fn parent_with_two_spouses_is_ambiguous() {
    let mut graph = graph_with(&["P", "S1", "S2", "C"]);
    for spouse in ["S1", "S2"] {
        relate(&mut graph, "P", spouse, EdgeType::Spouse, true).expect("spouse");
    }

    let outcome = relate(&mut graph, "P", "C", EdgeType::ParentToChild, true).expect("child");

    assert_eq!(
        outcome.message,
        "Parent P has multiple spouses [S1, S2]; other parent of C not inferred."
    );
    assert_eq!(graph.get_parents(&id("C")), vec![id("P")]);
}

#[test]
fn second_parent_with_several_spouses_adds_no_new_spouse() {
    let mut graph = graph_with(&["P", "S1", "S2", "C"]);
    for spouse in ["S1", "S2"] {
        relate(&mut graph, "P", spouse, EdgeType::Spouse, true).expect("spouse");
    }
    relate(&mut graph, "P", "C", EdgeType::ParentToChild, true).expect("child");
    let spouse_edges = graph
        .edges()
        .filter(|(_, _, e)| e.edge_type == EdgeType::Spouse)
        .count();

    let outcome = relate(&mut graph, "C", "S2", EdgeType::ChildToParent, true).expect("parent");

    assert_eq!(outcome.message, "Relationships processed.");
    assert_eq!(outcome.established.len(), 2);
    assert_eq!(graph.get_parents(&id("C")), vec![id("P"), id("S2")]);
    assert!(!graph.has_edge_of(&id("S1"), &id("C"), EdgeType::ParentToChild));
    let spouse_edges_after = graph
        .edges()
        .filter(|(_, _, e)| e.edge_type == EdgeType::Spouse)
        .count();
    assert_eq!(spouse_edges_after, spouse_edges);

    let store = graph.to_store();
    let reloaded = Graph::from_store(&store).expect("reload");
    assert_eq!(reloaded.to_store(), store);
    assert_eq!(reloaded.get_parents(&id("C")), vec![id("P"), id("S2")]);
}

#[test]
fn family_units_survive_reload_unchanged() {
    let mut graph = graph_with(&["P", "S1", "S2", "C1", "C2"]);
    relate(&mut graph, "P", "C1", EdgeType::ParentToChild, false).expect("c1");
    relate(&mut graph, "S2", "C2", EdgeType::ParentToChild, false).expect("c2");
    relate(&mut graph, "P", "S1", EdgeType::Spouse, false).expect("s1");
    let units_before: Vec<_> = graph.family_units().cloned().collect();
    assert_eq!(units_before.len(), 2);

    let reloaded = Graph::from_store(&graph.to_store()).expect("reload");
    let units_after: Vec<_> = reloaded.family_units().cloned().collect();
    assert_eq!(units_after, units_before);
    let twice = Graph::from_store(&reloaded.to_store()).expect("reload again");
    assert_eq!(twice.to_store(), graph.to_store());
}

#[test]
fn inference_can_be_disabled() {
    let mut graph = graph_with(&["A", "B", "C"]);
    relate(&mut graph, "A", "B", EdgeType::Spouse, false).expect("spouse");
    let outcome = relate(&mut graph, "A", "C", EdgeType::ParentToChild, false).expect("child");
    assert_eq!(outcome.established.len(), 2);
    assert_eq!(graph.get_parents(&id("C")), vec![id("A")]);
}

// =============================================================================
// DELETION
// =============================================================================

#[test]
fn cascade_removes_orphaned_spouse() {
    let mut graph = graph_with(&["A", "B"]);
    relate(&mut graph, "A", "B", EdgeType::Spouse, true).expect("spouse");

    let removed = MutationEngine::delete_member(&mut graph, &id("A"), true).expect("delete");

    assert_eq!(removed, vec![id("A"), id("B")]);
    assert!(graph.is_empty());
    assert_eq!(graph.family_units().count(), 0);
}

#[test]
fn cascade_keeps_relatives_with_other_ties() {
    let mut graph = weasleys();
    let removed = MutationEngine::delete_member(&mut graph, &id("ARTHW"), true).expect("delete");

    assert_eq!(removed, vec![id("ARTHW")]);
    assert_eq!(graph.node_count(), 8);
    // seven children to Molly, both directions
    assert_eq!(graph.edge_count(), 14);
    assert!(!graph.has_spouse(&id("MOLLW")));
}

#[test]
fn deleting_one_direction_keeps_the_other() {
    let mut graph = weasleys();
    let removed =
        MutationEngine::delete_relationship(&mut graph, &id("ARTHW"), &id("BILLW"), false)
            .expect("delete");

    assert_eq!(removed.len(), 1);
    assert!(graph.has_edge_of(&id("BILLW"), &id("ARTHW"), EdgeType::ChildToParent));
    assert_eq!(graph.edge_count(), 29);
}

// =============================================================================
// SESSION & MERGE
// =============================================================================

#[test]
fn first_member_into_empty_tree() {
    let mut session = TreeSession::new(
        Box::new(SequentialIdGenerator::default()),
        ReconcileConfig::default(),
    );
    let result = session
        .add_member(&MemberDraft::named("Arthur Weasley"), None, None, true)
        .expect("add");

    assert!(result.established.is_empty());
    assert_eq!(session.graph().node_count(), 1);
    assert_eq!(session.graph().edge_count(), 0);
}

#[test]
fn merging_the_same_family_changes_nothing_structural() {
    let base = weasleys().to_store();
    let mut incoming = EntityStore::new();
    incoming.insert_member(person("X1", "Arthur Weasley", Gender::Male, (1950, 2, 6)));
    incoming.insert_member(person("X2", "Ginny Weasley", Gender::Female, (1981, 8, 11)));
    incoming
        .relationships_mut(&id("X1"))
        .children_ids
        .push(id("X2"));
    incoming
        .relationships_mut(&id("X2"))
        .parent_ids
        .push(id("X1"));

    let mut ids = SequentialIdGenerator::new("N");
    let outcome = TreeMerger::new(&TokenSetRatio, ReconcileConfig::default())
        .merge(&base, &incoming, &mut ids)
        .expect("merge");

    assert!(outcome.report.added.is_empty());
    assert_eq!(outcome.report.id_map.get(&id("X1")), Some(&id("ARTHW")));
    assert_eq!(outcome.report.id_map.get(&id("X2")), Some(&id("GINNW")));
    let merged = Graph::from_store(&outcome.store).expect("load merged");
    assert_eq!(merged.node_count(), 9);
    assert_eq!(merged.edge_count(), 30);
}

#[test]
fn merge_is_deterministic() {
    let base = weasleys().to_store();
    let mut incoming = EntityStore::new();
    incoming.insert_member(Member::new("Y1", "Bill Weasley"));
    incoming.insert_member(Member::new("Y2", "Fleur Delacour"));
    incoming
        .relationships_mut(&id("Y1"))
        .spouse_ids
        .push(id("Y2"));

    let merger = TreeMerger::new(&TokenSetRatio, ReconcileConfig::default());
    let first = merger
        .merge(&base, &incoming, &mut SequentialIdGenerator::new("N"))
        .expect("merge");
    let second = merger
        .merge(&base, &incoming, &mut SequentialIdGenerator::new("N"))
        .expect("merge");

    assert_eq!(first.store, second.store);
    assert_eq!(first.report, second.report);
    assert_eq!(first.report.added, vec![id("N0001")]);
}
