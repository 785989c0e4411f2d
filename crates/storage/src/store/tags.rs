#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use vg_core::ids::TagId;
use vg_core::tags::TagName;

impl SqliteStore {
    /// Registers a tag on `snapshot_id`. Tags are append-only and their
    /// names are unique across the whole store; a duplicate name fails the
    /// UNIQUE constraint and surfaces as `TagAlreadyExists`.
    pub fn create_tag(
        &mut self,
        snapshot_id: SnapshotId,
        name: &TagName,
        description: &str,
    ) -> Result<TagRow, StoreError> {
        let now_ms = now_ms();

        let tx = self.conn.transaction()?;
        ensure_snapshot_exists_tx(&tx, snapshot_id)?;

        let insert = tx.execute(
            "INSERT INTO tags(snapshot_id, name, description, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4)",
            params![snapshot_id.as_i64(), name.as_str(), description, now_ms],
        );
        if let Err(err) = insert {
            return Err(map_tag_conflict(err));
        }
        let id = TagId::new(tx.last_insert_rowid());

        tx.commit()?;
        Ok(TagRow {
            id,
            snapshot_id,
            name: name.as_str().to_string(),
            description: description.to_string(),
            created_at_ms: now_ms,
        })
    }

    pub fn resolve_tag(&self, name: &str) -> Result<TagRow, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, snapshot_id, name, description, created_at_ms FROM tags WHERE name=?1",
                params![name],
                |row| {
                    Ok(TagRow {
                        id: TagId::new(row.get(0)?),
                        snapshot_id: SnapshotId::new(row.get(1)?),
                        name: row.get(2)?,
                        description: row.get(3)?,
                        created_at_ms: row.get(4)?,
                    })
                },
            )
            .optional()?;

        row.ok_or(StoreError::UnknownTag)
    }

    pub fn list_tags(&self) -> Result<Vec<TagRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, snapshot_id, name, description, created_at_ms FROM tags \
             ORDER BY created_at_ms DESC, name ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(TagRow {
                id: TagId::new(row.get(0)?),
                snapshot_id: SnapshotId::new(row.get(1)?),
                name: row.get(2)?,
                description: row.get(3)?,
                created_at_ms: row.get(4)?,
            });
        }
        Ok(out)
    }
}
