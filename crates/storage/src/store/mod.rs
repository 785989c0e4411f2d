#![forbid(unsafe_code)]

mod content;
mod error;
mod rows;
mod tags;
mod traverse;
mod versions;

pub use error::StoreError;
pub use rows::*;
pub use traverse::PathStep;

use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vg_core::ids::{SnapshotId, TreeId};
use vg_core::trees::TreeName;

const DB_FILE: &str = "vergraph.db";
const SCHEMA_VERSION: i64 = 1;

/// Owns the SQLite connection. A single `&mut SqliteStore` is the one active
/// mutator per process; multi-step writes run inside one transaction so
/// readers on other connections never observe partial state.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE)
    }

    pub fn create_tree(&mut self, name: &str) -> Result<TreeRow, StoreError> {
        let name =
            TreeName::try_new(name).map_err(|err| StoreError::InvalidInput(err.message()))?;
        let now_ms = now_ms();

        self.conn.execute(
            "INSERT INTO trees(name, created_at_ms) VALUES (?1, ?2)",
            params![name.as_str(), now_ms],
        )?;

        Ok(TreeRow {
            id: TreeId::new(self.conn.last_insert_rowid()),
            name: name.as_str().to_string(),
            created_at_ms: now_ms,
        })
    }

    pub fn tree(&self, id: TreeId) -> Result<Option<TreeRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at_ms FROM trees WHERE id=?1",
                params![id.as_i64()],
                |row| {
                    Ok(TreeRow {
                        id: TreeId::new(row.get(0)?),
                        name: row.get(1)?,
                        created_at_ms: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = [
        "schema_state",
        "trees",
        "snapshots",
        "tags",
        "nodes",
        "edges",
    ]
    .into_iter()
    .collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM schema_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS trees (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS snapshots (
          id INTEGER PRIMARY KEY,
          tree_id INTEGER NOT NULL,
          parent_snapshot_id INTEGER,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(tree_id) REFERENCES trees(id) ON DELETE CASCADE,
          FOREIGN KEY(parent_snapshot_id) REFERENCES snapshots(id) ON DELETE RESTRICT,
          CHECK(parent_snapshot_id IS NULL OR parent_snapshot_id <> id)
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_tree
          ON snapshots(tree_id, created_at_ms);

        CREATE TABLE IF NOT EXISTS tags (
          id INTEGER PRIMARY KEY,
          snapshot_id INTEGER NOT NULL,
          name TEXT NOT NULL UNIQUE,
          description TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE RESTRICT
        );

        CREATE TABLE IF NOT EXISTS nodes (
          id INTEGER PRIMARY KEY,
          snapshot_id INTEGER NOT NULL,
          data TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_snapshot
          ON nodes(snapshot_id);

        CREATE TABLE IF NOT EXISTS edges (
          id INTEGER PRIMARY KEY,
          snapshot_id INTEGER NOT NULL,
          source_node_id INTEGER NOT NULL,
          target_node_id INTEGER NOT NULL,
          data TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE CASCADE,
          FOREIGN KEY(source_node_id) REFERENCES nodes(id) ON DELETE RESTRICT,
          FOREIGN KEY(target_node_id) REFERENCES nodes(id) ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_edges_snapshot
          ON edges(snapshot_id);
        CREATE INDEX IF NOT EXISTS idx_edges_snapshot_source
          ON edges(snapshot_id, source_node_id);
        CREATE INDEX IF NOT EXISTS idx_edges_snapshot_target
          ON edges(snapshot_id, target_node_id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO schema_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

fn tree_exists_tx(tx: &Transaction<'_>, tree_id: TreeId) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM trees WHERE id=?1",
            params![tree_id.as_i64()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

fn snapshot_row_tx(
    tx: &Transaction<'_>,
    id: SnapshotId,
) -> Result<Option<SnapshotRow>, StoreError> {
    Ok(tx
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

fn ensure_snapshot_exists_tx(tx: &Transaction<'_>, id: SnapshotId) -> Result<(), StoreError> {
    let exists = tx
        .query_row(
            "SELECT 1 FROM snapshots WHERE id=?1",
            params![id.as_i64()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();

    if exists {
        Ok(())
    } else {
        Err(StoreError::UnknownSnapshot)
    }
}

fn map_tag_conflict(err: rusqlite::Error) -> StoreError {
    if is_constraint_violation(&err) {
        return StoreError::TagAlreadyExists;
    }
    StoreError::Sql(err)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn parse_payload(text: &str) -> Result<Value, StoreError> {
    serde_json::from_str(text).map_err(|_| StoreError::InvalidInput("payload is not valid json"))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
