#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;
use std::collections::{HashMap, HashSet, VecDeque};
use vg_core::ids::NodeId;

/// One hop of a discovered path: the node reached, plus the edge used to
/// leave it toward the next step. The final step carries no edge.
#[derive(Clone, Debug, PartialEq)]
pub struct PathStep {
    pub node: NodeRow,
    pub edge: Option<EdgeRow>,
}

impl SqliteStore {
    /// Nodes of the snapshot that are never an edge target.
    pub fn roots(&self, snapshot_id: SnapshotId) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, data, created_at_ms FROM nodes \
             WHERE snapshot_id=?1 \
               AND id NOT IN (SELECT target_node_id FROM edges WHERE snapshot_id=?1) \
             ORDER BY id",
        )?;
        let mut rows = stmt.query(params![snapshot_id.as_i64()])?;
        collect_node_rows(&mut rows)
    }

    /// Nodes that are the target of an edge whose source is `node_id`.
    pub fn children(
        &self,
        snapshot_id: SnapshotId,
        node_id: NodeId,
    ) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.snapshot_id, n.data, n.created_at_ms \
             FROM nodes n JOIN edges e ON e.target_node_id = n.id \
             WHERE e.snapshot_id=?1 AND n.snapshot_id=?1 AND e.source_node_id=?2 \
             ORDER BY e.id",
        )?;
        let mut rows = stmt.query(params![snapshot_id.as_i64(), node_id.as_i64()])?;
        collect_node_rows(&mut rows)
    }

    /// Nodes that are the source of an edge whose target is `node_id`.
    pub fn parents(
        &self,
        snapshot_id: SnapshotId,
        node_id: NodeId,
    ) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.snapshot_id, n.data, n.created_at_ms \
             FROM nodes n JOIN edges e ON e.source_node_id = n.id \
             WHERE e.snapshot_id=?1 AND n.snapshot_id=?1 AND e.target_node_id=?2 \
             ORDER BY e.id",
        )?;
        let mut rows = stmt.query(params![snapshot_id.as_i64(), node_id.as_i64()])?;
        collect_node_rows(&mut rows)
    }

    /// Breadth-first layering from the whole root set at once: the roots are
    /// depth 0, their unvisited targets depth 1, and so on. A global visited
    /// set keeps multiple components independent and cuts cycles short.
    /// Negative depths yield nothing.
    pub fn nodes_at_depth(
        &self,
        snapshot_id: SnapshotId,
        depth: i64,
    ) -> Result<Vec<NodeRow>, StoreError> {
        if depth < 0 {
            return Ok(Vec::new());
        }

        let node_map = self.node_map(snapshot_id)?;
        let adjacency = self.adjacency(snapshot_id)?;

        let mut queue: VecDeque<(i64, i64)> = self
            .roots(snapshot_id)?
            .into_iter()
            .map(|node| (node.id.as_i64(), 0))
            .collect();
        let mut visited: HashSet<i64> = HashSet::new();
        let mut hits: Vec<i64> = Vec::new();

        while let Some((id, level)) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }

            if level == depth {
                hits.push(id);
            } else if level < depth {
                if let Some(next) = adjacency.get(&id) {
                    for (target, _) in next {
                        queue.push_back((*target, level + 1));
                    }
                }
            }
        }

        hits.sort_unstable();
        Ok(hits
            .into_iter()
            .filter_map(|id| node_map.get(&id).cloned())
            .collect())
    }

    /// Breadth-first search following edges strictly from source to target.
    /// Returns the first path discovered, which is minimal in edge count, or
    /// an empty sequence when `start` is missing or `end` is unreachable.
    pub fn find_path(
        &self,
        snapshot_id: SnapshotId,
        start: NodeId,
        end: NodeId,
    ) -> Result<Vec<PathStep>, StoreError> {
        let node_map = self.node_map(snapshot_id)?;
        if !node_map.contains_key(&start.as_i64()) {
            return Ok(Vec::new());
        }

        let adjacency = self.adjacency(snapshot_id)?;

        let mut queue: VecDeque<i64> = VecDeque::new();
        let mut visited: HashSet<i64> = HashSet::new();
        let mut came_from: HashMap<i64, (i64, EdgeRow)> = HashMap::new();

        queue.push_back(start.as_i64());
        visited.insert(start.as_i64());

        while let Some(current) = queue.pop_front() {
            if current == end.as_i64() {
                return Ok(reconstruct_path(
                    &node_map,
                    &came_from,
                    start.as_i64(),
                    current,
                ));
            }

            if let Some(next) = adjacency.get(&current) {
                for (target, edge) in next {
                    if visited.insert(*target) {
                        came_from.insert(*target, (current, edge.clone()));
                        queue.push_back(*target);
                    }
                }
            }
        }

        Ok(Vec::new())
    }

    fn node_map(&self, snapshot_id: SnapshotId) -> Result<HashMap<i64, NodeRow>, StoreError> {
        Ok(self
            .snapshot_nodes(snapshot_id)?
            .into_iter()
            .map(|node| (node.id.as_i64(), node))
            .collect())
    }

    // Outgoing edges per source node, in edge insertion order.
    fn adjacency(
        &self,
        snapshot_id: SnapshotId,
    ) -> Result<HashMap<i64, Vec<(i64, EdgeRow)>>, StoreError> {
        let mut adjacency: HashMap<i64, Vec<(i64, EdgeRow)>> = HashMap::new();
        for edge in self.snapshot_edges(snapshot_id)? {
            adjacency
                .entry(edge.source_node_id.as_i64())
                .or_default()
                .push((edge.target_node_id.as_i64(), edge));
        }
        Ok(adjacency)
    }
}

fn reconstruct_path(
    node_map: &HashMap<i64, NodeRow>,
    came_from: &HashMap<i64, (i64, EdgeRow)>,
    start: i64,
    end: i64,
) -> Vec<PathStep> {
    let mut steps: Vec<PathStep> = Vec::new();
    let mut cursor = end;
    let mut edge_to_next: Option<EdgeRow> = None;

    loop {
        let Some(node) = node_map.get(&cursor) else {
            return Vec::new();
        };
        steps.push(PathStep {
            node: node.clone(),
            edge: edge_to_next.take(),
        });
        if cursor == start {
            break;
        }
        let Some((previous, edge)) = came_from.get(&cursor) else {
            return Vec::new();
        };
        edge_to_next = Some(edge.clone());
        cursor = *previous;
    }

    steps.reverse();
    steps
}

fn collect_node_rows(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<NodeRow>, StoreError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let data = row.get::<_, String>(2)?;
        out.push(NodeRow {
            id: NodeId::new(row.get(0)?),
            snapshot_id: SnapshotId::new(row.get(1)?),
            data: parse_payload(&data)?,
            created_at_ms: row.get(3)?,
        });
    }
    Ok(out)
}
