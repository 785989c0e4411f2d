#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use vg_core::ids::{EdgeId, NodeId};

impl SqliteStore {
    pub fn insert_node(
        &mut self,
        snapshot_id: SnapshotId,
        data: &Value,
    ) -> Result<NodeRow, StoreError> {
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        ensure_snapshot_exists_tx(&tx, snapshot_id)?;

        tx.execute(
            "INSERT INTO nodes(snapshot_id, data, created_at_ms) VALUES (?1, ?2, ?3)",
            params![snapshot_id.as_i64(), data.to_string(), now_ms],
        )?;
        let id = NodeId::new(tx.last_insert_rowid());

        tx.commit()?;
        Ok(NodeRow {
            id,
            snapshot_id,
            data: data.clone(),
            created_at_ms: now_ms,
        })
    }

    /// Inserts a directed edge. Both endpoints must already exist as nodes
    /// of the same snapshot the edge is written to.
    pub fn insert_edge(
        &mut self,
        snapshot_id: SnapshotId,
        source_node_id: NodeId,
        target_node_id: NodeId,
        data: &Value,
    ) -> Result<EdgeRow, StoreError> {
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        ensure_snapshot_exists_tx(&tx, snapshot_id)?;
        ensure_node_in_snapshot_tx(&tx, snapshot_id, source_node_id)?;
        ensure_node_in_snapshot_tx(&tx, snapshot_id, target_node_id)?;

        tx.execute(
            "INSERT INTO edges(snapshot_id, source_node_id, target_node_id, data, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot_id.as_i64(),
                source_node_id.as_i64(),
                target_node_id.as_i64(),
                data.to_string(),
                now_ms
            ],
        )?;
        let id = EdgeId::new(tx.last_insert_rowid());

        tx.commit()?;
        Ok(EdgeRow {
            id,
            snapshot_id,
            source_node_id,
            target_node_id,
            data: data.clone(),
            created_at_ms: now_ms,
        })
    }

    pub fn node(&self, id: NodeId) -> Result<Option<NodeRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, snapshot_id, data, created_at_ms FROM nodes WHERE id=?1",
                params![id.as_i64()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, snapshot_id, data, created_at_ms)) => Ok(Some(NodeRow {
                id: NodeId::new(id),
                snapshot_id: SnapshotId::new(snapshot_id),
                data: parse_payload(&data)?,
                created_at_ms,
            })),
            None => Ok(None),
        }
    }

    pub fn snapshot_nodes(&self, snapshot_id: SnapshotId) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, data, created_at_ms FROM nodes \
             WHERE snapshot_id=?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![snapshot_id.as_i64()])?;
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

    pub fn snapshot_edges(&self, snapshot_id: SnapshotId) -> Result<Vec<EdgeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, source_node_id, target_node_id, data, created_at_ms \
             FROM edges WHERE snapshot_id=?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![snapshot_id.as_i64()])?;
        collect_edge_rows(&mut rows)
    }

    /// Edges where `node_id` is either endpoint, within one snapshot.
    pub fn edges_for_node(
        &self,
        snapshot_id: SnapshotId,
        node_id: NodeId,
    ) -> Result<Vec<EdgeRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, source_node_id, target_node_id, data, created_at_ms \
             FROM edges \
             WHERE snapshot_id=?1 AND (source_node_id=?2 OR target_node_id=?2) \
             ORDER BY id",
        )?;
        let mut rows = stmt.query(params![snapshot_id.as_i64(), node_id.as_i64()])?;
        collect_edge_rows(&mut rows)
    }
}

fn ensure_node_in_snapshot_tx(
    tx: &Transaction<'_>,
    snapshot_id: SnapshotId,
    node_id: NodeId,
) -> Result<(), StoreError> {
    let owned = tx
        .query_row(
            "SELECT 1 FROM nodes WHERE id=?1 AND snapshot_id=?2",
            params![node_id.as_i64(), snapshot_id.as_i64()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if owned {
        Ok(())
    } else {
        Err(StoreError::UnknownNode)
    }
}

fn collect_edge_rows(rows: &mut rusqlite::Rows<'_>) -> Result<Vec<EdgeRow>, StoreError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let data = row.get::<_, String>(4)?;
        out.push(EdgeRow {
            id: EdgeId::new(row.get(0)?),
            snapshot_id: SnapshotId::new(row.get(1)?),
            source_node_id: NodeId::new(row.get(2)?),
            target_node_id: NodeId::new(row.get(3)?),
            data: parse_payload(&data)?,
            created_at_ms: row.get(5)?,
        });
    }
    Ok(out)
}
