#![forbid(unsafe_code)]

use serde_json::json;
use vg_core::ids::{NodeId, SnapshotId};
use vg_storage::{NodeRow, SqliteStore};
use std::collections::HashSet;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("vg_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn seed_snapshot(store: &mut SqliteStore, label: &str) -> SnapshotId {
    let tree = store.create_tree(label).expect("create tree");
    store
        .create_snapshot(tree.id, None)
        .expect("create snapshot")
        .id
}

fn add_node(store: &mut SqliteStore, snap: SnapshotId, label: &str) -> NodeId {
    store
        .insert_node(snap, &json!({ "label": label }))
        .expect("insert node")
        .id
}

fn add_edge(store: &mut SqliteStore, snap: SnapshotId, source: NodeId, target: NodeId) {
    store
        .insert_edge(snap, source, target, &json!({}))
        .expect("insert edge");
}

fn ids(nodes: &[NodeRow]) -> Vec<NodeId> {
    nodes.iter().map(|node| node.id).collect()
}

/// Two roots, seven nodes:
///
///   n1        n2
///  /  \      /  \
/// n3   n4  n5    n6
/// |
/// n7
fn two_component_layers(store: &mut SqliteStore) -> (SnapshotId, Vec<NodeId>) {
    let snap = seed_snapshot(store, "layers");
    let nodes: Vec<NodeId> = (1..=7)
        .map(|i| add_node(store, snap, &format!("n{i}")))
        .collect();
    add_edge(store, snap, nodes[0], nodes[2]);
    add_edge(store, snap, nodes[0], nodes[3]);
    add_edge(store, snap, nodes[1], nodes[4]);
    add_edge(store, snap, nodes[1], nodes[5]);
    add_edge(store, snap, nodes[2], nodes[6]);
    (snap, nodes)
}

#[test]
fn roots_are_nodes_without_incoming_edges() {
    let dir = temp_dir("roots_are_nodes_without_incoming_edges");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let (snap, nodes) = two_component_layers(&mut store);

    let roots = store.roots(snap).expect("roots");
    assert_eq!(ids(&roots), vec![nodes[0], nodes[1]]);
}

#[test]
fn children_and_parents_follow_edge_direction() {
    let dir = temp_dir("children_and_parents_follow_edge_direction");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let (snap, nodes) = two_component_layers(&mut store);

    let children = store.children(snap, nodes[0]).expect("children of n1");
    assert_eq!(ids(&children), vec![nodes[2], nodes[3]]);

    let parents = store.parents(snap, nodes[6]).expect("parents of n7");
    assert_eq!(ids(&parents), vec![nodes[2]]);

    assert!(store.children(snap, nodes[6]).expect("leaf").is_empty());
    assert!(store.parents(snap, nodes[0]).expect("root").is_empty());
}

#[test]
fn nodes_at_depth_layers_from_all_roots() {
    let dir = temp_dir("nodes_at_depth_layers_from_all_roots");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let (snap, nodes) = two_component_layers(&mut store);

    assert_eq!(
        ids(&store.nodes_at_depth(snap, 0).expect("depth 0")),
        vec![nodes[0], nodes[1]]
    );
    assert_eq!(store.nodes_at_depth(snap, 1).expect("depth 1").len(), 4);
    assert_eq!(
        ids(&store.nodes_at_depth(snap, 2).expect("depth 2")),
        vec![nodes[6]]
    );
    assert!(store.nodes_at_depth(snap, 3).expect("depth 3").is_empty());
    assert!(store.nodes_at_depth(snap, -1).expect("negative").is_empty());
}

#[test]
fn depth_layers_partition_the_reachable_set() {
    let dir = temp_dir("depth_layers_partition_the_reachable_set");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let (snap, nodes) = two_component_layers(&mut store);

    let mut seen: HashSet<NodeId> = HashSet::new();
    for depth in 0..=3 {
        for node in store.nodes_at_depth(snap, depth).expect("layer") {
            assert!(seen.insert(node.id), "node appears in two layers");
        }
    }
    assert_eq!(seen.len(), nodes.len());
}

#[test]
fn find_path_returns_minimal_edge_count() {
    let dir = temp_dir("find_path_returns_minimal_edge_count");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let snap = seed_snapshot(&mut store, "diamond");

    // a -> b -> d plus the shortcut a -> d.
    let a = add_node(&mut store, snap, "a");
    let b = add_node(&mut store, snap, "b");
    let d = add_node(&mut store, snap, "d");
    add_edge(&mut store, snap, a, b);
    add_edge(&mut store, snap, b, d);
    add_edge(&mut store, snap, a, d);

    let path = store.find_path(snap, a, d).expect("path");
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].node.id, a);
    assert_eq!(path[1].node.id, d);

    let hop = path[0].edge.as_ref().expect("first step carries its edge");
    assert_eq!(hop.source_node_id, a);
    assert_eq!(hop.target_node_id, d);
    assert!(path[1].edge.is_none(), "final step carries no edge");
}

#[test]
fn find_path_is_strictly_directed() {
    let dir = temp_dir("find_path_is_strictly_directed");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let snap = seed_snapshot(&mut store, "directed");

    let a = add_node(&mut store, snap, "a");
    let b = add_node(&mut store, snap, "b");
    add_edge(&mut store, snap, a, b);

    assert_eq!(store.find_path(snap, a, b).expect("forward").len(), 2);
    assert!(store.find_path(snap, b, a).expect("backward").is_empty());
}

#[test]
fn find_path_handles_missing_and_disconnected_nodes() {
    let dir = temp_dir("find_path_handles_missing_and_disconnected_nodes");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let snap = seed_snapshot(&mut store, "islands");

    let a = add_node(&mut store, snap, "a");
    let b = add_node(&mut store, snap, "b");

    assert!(store.find_path(snap, a, b).expect("no route").is_empty());
    assert!(
        store
            .find_path(snap, NodeId::new(9999), a)
            .expect("missing start")
            .is_empty()
    );

    let trivial = store.find_path(snap, a, a).expect("self path");
    assert_eq!(trivial.len(), 1);
    assert_eq!(trivial[0].node.id, a);
    assert!(trivial[0].edge.is_none());
}

#[test]
fn find_path_survives_cycles() {
    let dir = temp_dir("find_path_survives_cycles");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let snap = seed_snapshot(&mut store, "cycle");

    let a = add_node(&mut store, snap, "a");
    let b = add_node(&mut store, snap, "b");
    let c = add_node(&mut store, snap, "c");
    add_edge(&mut store, snap, a, b);
    add_edge(&mut store, snap, b, a);
    add_edge(&mut store, snap, b, c);

    let path = store.find_path(snap, a, c).expect("path through cycle");
    let path_ids: Vec<NodeId> = path.iter().map(|step| step.node.id).collect();
    assert_eq!(path_ids, vec![a, b, c]);
}
