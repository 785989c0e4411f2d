#![forbid(unsafe_code)]

use serde_json::Value;
use vg_core::ids::{EdgeId, NodeId, SnapshotId, TagId, TreeId};

#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub id: TreeId,
    pub name: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotRow {
    pub id: SnapshotId,
    pub tree_id: TreeId,
    pub parent_snapshot_id: Option<SnapshotId>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TagRow {
    pub id: TagId,
    pub snapshot_id: SnapshotId,
    pub name: String,
    pub description: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeRow {
    pub id: NodeId,
    pub snapshot_id: SnapshotId,
    pub data: Value,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRow {
    pub id: EdgeId,
    pub snapshot_id: SnapshotId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub data: Value,
    pub created_at_ms: i64,
}

/// Row counts written by one `clone_snapshot` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloneStats {
    pub nodes_copied: usize,
    pub edges_copied: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotStats {
    pub nodes: usize,
    pub edges: usize,
}
