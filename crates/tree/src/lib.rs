#![forbid(unsafe_code)]

//! Tree handle: the caller-facing orchestration over the snapshot store.
//!
//! A handle is plain data (tree id plus working/checkpoint snapshot
//! pointers); every operation takes the store explicitly, so there is no
//! hidden connection anywhere. Mutations land in the working snapshot only.
//! `create_tag` freezes the working content into a new snapshot and binds a
//! tag to it; branching and restoring clone a tagged snapshot into a fresh
//! working frontier, abandoning whatever uncommitted edits the previous
//! handle had accumulated.

use serde_json::Value;
use vg_core::ids::{NodeId, SnapshotId, TreeId};
use vg_core::tags::TagName;
use vg_storage::{
    EdgeRow, NodeRow, PathStep, SnapshotRow, SqliteStore, StoreError, TagRow, TreeRow,
};

#[derive(Debug)]
pub enum TreeError {
    Store(StoreError),
    NoWorkingSnapshot,
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store: {err}"),
            Self::NoWorkingSnapshot => write!(f, "no working snapshot bound"),
        }
    }
}

impl std::error::Error for TreeError {}

impl From<StoreError> for TreeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Handle over one version lineage of a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeHandle {
    tree_id: TreeId,
    working: Option<SnapshotId>,
    checkpoint: Option<SnapshotId>,
}

impl TreeHandle {
    /// Creates a new tree and binds a fresh empty working snapshot to it.
    pub fn create(store: &mut SqliteStore, name: &str) -> Result<Self, TreeError> {
        let tree = store.create_tree(name)?;
        let working = store.create_snapshot(tree.id, None)?;
        Ok(Self {
            tree_id: tree.id,
            working: Some(working.id),
            checkpoint: None,
        })
    }

    /// Binds to an existing tree with a fresh empty working snapshot.
    pub fn open(store: &mut SqliteStore, tree_id: TreeId) -> Result<Self, TreeError> {
        if store.tree(tree_id)?.is_none() {
            return Err(StoreError::UnknownTree.into());
        }
        let working = store.create_snapshot(tree_id, None)?;
        Ok(Self {
            tree_id,
            working: Some(working.id),
            checkpoint: None,
        })
    }

    /// Binds to an existing tree without allocating a working snapshot.
    /// Queries fail with `NoWorkingSnapshot` until the first mutation
    /// lazily allocates one.
    pub fn attach(store: &SqliteStore, tree_id: TreeId) -> Result<Self, TreeError> {
        if store.tree(tree_id)?.is_none() {
            return Err(StoreError::UnknownTree.into());
        }
        Ok(Self {
            tree_id,
            working: None,
            checkpoint: None,
        })
    }

    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    pub fn working_snapshot(&self) -> Option<SnapshotId> {
        self.working
    }

    pub fn checkpoint_snapshot(&self) -> Option<SnapshotId> {
        self.checkpoint
    }

    pub fn tree(&self, store: &SqliteStore) -> Result<Option<TreeRow>, TreeError> {
        Ok(store.tree(self.tree_id)?)
    }

    pub fn add_node(&mut self, store: &mut SqliteStore, data: &Value) -> Result<NodeRow, TreeError> {
        let working = self.ensure_working(store)?;
        Ok(store.insert_node(working, data)?)
    }

    pub fn add_edge(
        &mut self,
        store: &mut SqliteStore,
        source: NodeId,
        target: NodeId,
        data: &Value,
    ) -> Result<EdgeRow, TreeError> {
        let working = self.ensure_working(store)?;
        Ok(store.insert_edge(working, source, target, data)?)
    }

    /// Freezes the current working content under a new tag.
    ///
    /// A new snapshot is allocated with the current checkpoint as its parent
    /// (or a fresh empty snapshot when this lineage has never been tagged),
    /// the working content is cloned into it, the tag is registered on it,
    /// and it becomes the new checkpoint. The tag is permanently bound to
    /// that snapshot; later edits to the working frontier cannot reach it.
    pub fn create_tag(
        &mut self,
        store: &mut SqliteStore,
        name: &str,
        description: &str,
    ) -> Result<TagRow, TreeError> {
        let name =
            TagName::try_new(name).map_err(|err| StoreError::InvalidInput(err.message()))?;

        // Checked before any snapshot allocation so a duplicate name leaves
        // no rows behind.
        match store.resolve_tag(name.as_str()) {
            Ok(_) => return Err(StoreError::TagAlreadyExists.into()),
            Err(StoreError::UnknownTag) => {}
            Err(err) => return Err(err.into()),
        }

        let working = self.ensure_working(store)?;
        let parent = match self.checkpoint {
            Some(checkpoint) => checkpoint,
            None => store.create_snapshot(self.tree_id, None)?.id,
        };

        let sealed = store.create_snapshot(self.tree_id, Some(parent))?;
        store.clone_snapshot(sealed.id, working)?;
        let tag = store.create_tag(sealed.id, &name, description)?;

        self.checkpoint = Some(sealed.id);
        Ok(tag)
    }

    /// Starts a new lineage from the snapshot a tag points to. The tagged
    /// content is cloned into a fresh working snapshot whose parent is the
    /// tagged snapshot; edits accumulated in any other handle's working
    /// snapshot since that tag are simply not carried forward.
    pub fn branch_from_tag(store: &mut SqliteStore, name: &str) -> Result<Self, TreeError> {
        let tag = store.resolve_tag(name)?;
        let tagged = store
            .snapshot(tag.snapshot_id)?
            .ok_or(StoreError::UnknownSnapshot)?;

        let working = store.create_snapshot(tagged.tree_id, Some(tagged.id))?;
        store.clone_snapshot(working.id, tagged.id)?;

        Ok(Self {
            tree_id: tagged.tree_id,
            working: Some(working.id),
            checkpoint: Some(tagged.id),
        })
    }

    /// Rollback: identical to `branch_from_tag`.
    pub fn restore_from_tag(store: &mut SqliteStore, name: &str) -> Result<Self, TreeError> {
        Self::branch_from_tag(store, name)
    }

    pub fn nodes(&self, store: &SqliteStore) -> Result<Vec<NodeRow>, TreeError> {
        Ok(store.snapshot_nodes(self.require_working()?)?)
    }

    pub fn edges(&self, store: &SqliteStore) -> Result<Vec<EdgeRow>, TreeError> {
        Ok(store.snapshot_edges(self.require_working()?)?)
    }

    pub fn node(&self, store: &SqliteStore, id: NodeId) -> Result<Option<NodeRow>, TreeError> {
        let working = self.require_working()?;
        Ok(store.node(id)?.filter(|node| node.snapshot_id == working))
    }

    pub fn node_edges(&self, store: &SqliteStore, id: NodeId) -> Result<Vec<EdgeRow>, TreeError> {
        Ok(store.edges_for_node(self.require_working()?, id)?)
    }

    pub fn children(&self, store: &SqliteStore, id: NodeId) -> Result<Vec<NodeRow>, TreeError> {
        Ok(store.children(self.require_working()?, id)?)
    }

    pub fn parents(&self, store: &SqliteStore, id: NodeId) -> Result<Vec<NodeRow>, TreeError> {
        Ok(store.parents(self.require_working()?, id)?)
    }

    pub fn roots(&self, store: &SqliteStore) -> Result<Vec<NodeRow>, TreeError> {
        Ok(store.roots(self.require_working()?)?)
    }

    pub fn nodes_at_depth(
        &self,
        store: &SqliteStore,
        depth: i64,
    ) -> Result<Vec<NodeRow>, TreeError> {
        Ok(store.nodes_at_depth(self.require_working()?, depth)?)
    }

    pub fn find_path(
        &self,
        store: &SqliteStore,
        start: NodeId,
        end: NodeId,
    ) -> Result<Vec<PathStep>, TreeError> {
        Ok(store.find_path(self.require_working()?, start, end)?)
    }

    pub fn working_row(&self, store: &SqliteStore) -> Result<Option<SnapshotRow>, TreeError> {
        match self.working {
            Some(working) => Ok(store.snapshot(working)?),
            None => Ok(None),
        }
    }

    fn ensure_working(&mut self, store: &mut SqliteStore) -> Result<SnapshotId, TreeError> {
        if let Some(working) = self.working {
            return Ok(working);
        }
        let working = store.create_snapshot(self.tree_id, None)?;
        self.working = Some(working.id);
        Ok(working.id)
    }

    fn require_working(&self) -> Result<SnapshotId, TreeError> {
        self.working.ok_or(TreeError::NoWorkingSnapshot)
    }
}
