#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;
use vg_core::ids::NodeId;

impl SqliteStore {
    /// Allocates an empty snapshot for `tree_id`. The parent, when given,
    /// must be an existing snapshot of the same tree.
    pub fn create_snapshot(
        &mut self,
        tree_id: TreeId,
        parent_snapshot_id: Option<SnapshotId>,
    ) -> Result<SnapshotRow, StoreError> {
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        if !tree_exists_tx(&tx, tree_id)? {
            return Err(StoreError::UnknownTree);
        }

        if let Some(parent_id) = parent_snapshot_id {
            let Some(parent) = snapshot_row_tx(&tx, parent_id)? else {
                return Err(StoreError::UnknownSnapshot);
            };
            if parent.tree_id != tree_id {
                return Err(StoreError::InvalidInput(
                    "parent snapshot belongs to a different tree",
                ));
            }
        }

        tx.execute(
            "INSERT INTO snapshots(tree_id, parent_snapshot_id, created_at_ms) VALUES (?1, ?2, ?3)",
            params![
                tree_id.as_i64(),
                parent_snapshot_id.map(SnapshotId::as_i64),
                now_ms
            ],
        )?;
        let id = SnapshotId::new(tx.last_insert_rowid());

        tx.commit()?;
        Ok(SnapshotRow {
            id,
            tree_id,
            parent_snapshot_id,
            created_at_ms: now_ms,
        })
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<Option<SnapshotRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, tree_id, parent_snapshot_id, created_at_ms FROM snapshots WHERE id=?1",
                params![id.as_i64()],
                |row| {
                    Ok(SnapshotRow {
                        id: SnapshotId::new(row.get(0)?),
                        tree_id: TreeId::new(row.get(1)?),
                        parent_snapshot_id: row.get::<_, Option<i64>>(2)?.map(SnapshotId::new),
                        created_at_ms: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    /// Copy-on-write clone: every node of `src` is re-inserted under `dest`
    /// with a fresh id while an old-to-new map is accumulated, then every
    /// edge is re-inserted with both endpoints rewritten through that map.
    /// Runs as one transaction; an edge endpoint missing from the map means
    /// the source snapshot is corrupted, and the whole clone rolls back
    /// leaving zero rows under `dest`.
    pub fn clone_snapshot(
        &mut self,
        dest: SnapshotId,
        src: SnapshotId,
    ) -> Result<CloneStats, StoreError> {
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        ensure_snapshot_exists_tx(&tx, dest)?;
        ensure_snapshot_exists_tx(&tx, src)?;

        // Payload text is copied verbatim, never parsed.
        let src_nodes = {
            let mut stmt =
                tx.prepare("SELECT id, data FROM nodes WHERE snapshot_id=?1 ORDER BY id")?;
            let mut rows = stmt.query(params![src.as_i64()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push((row.get::<_, i64>(0)?, row.get::<_, String>(1)?));
            }
            out
        };

        let mut remap: HashMap<i64, i64> = HashMap::with_capacity(src_nodes.len());
        for (old_id, data) in &src_nodes {
            tx.execute(
                "INSERT INTO nodes(snapshot_id, data, created_at_ms) VALUES (?1, ?2, ?3)",
                params![dest.as_i64(), data, now_ms],
            )?;
            remap.insert(*old_id, tx.last_insert_rowid());
        }

        let src_edges = {
            let mut stmt = tx.prepare(
                "SELECT source_node_id, target_node_id, data FROM edges \
                 WHERE snapshot_id=?1 ORDER BY id",
            )?;
            let mut rows = stmt.query(params![src.as_i64()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ));
            }
            out
        };

        for (source, target, data) in &src_edges {
            let Some(new_source) = remap.get(source) else {
                return Err(StoreError::ConsistencyViolation {
                    snapshot_id: src,
                    node_id: NodeId::new(*source),
                });
            };
            let Some(new_target) = remap.get(target) else {
                return Err(StoreError::ConsistencyViolation {
                    snapshot_id: src,
                    node_id: NodeId::new(*target),
                });
            };
            tx.execute(
                "INSERT INTO edges(snapshot_id, source_node_id, target_node_id, data, created_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![dest.as_i64(), new_source, new_target, data, now_ms],
            )?;
        }

        tx.commit()?;
        Ok(CloneStats {
            nodes_copied: src_nodes.len(),
            edges_copied: src_edges.len(),
        })
    }

    pub fn snapshot_stats(&self, id: SnapshotId) -> Result<SnapshotStats, StoreError> {
        if self.snapshot(id)?.is_none() {
            return Err(StoreError::UnknownSnapshot);
        }

        let nodes = self.conn.query_row(
            "SELECT COUNT(1) FROM nodes WHERE snapshot_id=?1",
            params![id.as_i64()],
            |row| row.get::<_, i64>(0),
        )?;
        let edges = self.conn.query_row(
            "SELECT COUNT(1) FROM edges WHERE snapshot_id=?1",
            params![id.as_i64()],
            |row| row.get::<_, i64>(0),
        )?;

        Ok(SnapshotStats {
            nodes: nodes.max(0) as usize,
            edges: edges.max(0) as usize,
        })
    }
}
