#![forbid(unsafe_code)]

use vg_core::ids::{NodeId, SnapshotId};

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownTree,
    UnknownSnapshot,
    UnknownTag,
    UnknownNode,
    TagAlreadyExists,
    ConsistencyViolation {
        snapshot_id: SnapshotId,
        node_id: NodeId,
    },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownTree => write!(f, "unknown tree"),
            Self::UnknownSnapshot => write!(f, "unknown snapshot"),
            Self::UnknownTag => write!(f, "unknown tag"),
            Self::UnknownNode => write!(f, "unknown node"),
            Self::TagAlreadyExists => write!(f, "tag already exists"),
            Self::ConsistencyViolation {
                snapshot_id,
                node_id,
            } => write!(
                f,
                "consistency violation (snapshot={}, node={})",
                snapshot_id.as_i64(),
                node_id.as_i64()
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
