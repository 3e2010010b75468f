//! Node records and the arena that owns them.
//!
//! Nodes reference their children through copyable [`NodeId`] handles into a
//! slab-style arena owned by the [`Tree`](crate::Tree), never through owning
//! recursion. Children hold no back-references to parents; all writes
//! proceed strictly root-to-leaf.

use std::collections::BTreeMap;

use serde_json::Value;

/// Handle to a node in a [`Tree`](crate::Tree)'s arena.
///
/// Handles are invalidated when an ancestor's cache is cleared; using an
/// invalidated handle is a programming error and panics, like indexing a
/// vector out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// What a cached key resolves to in memory.
#[derive(Clone, Debug)]
pub(crate) enum Slot {
    /// A plain JSON value, loaded whole from one leaf file.
    Leaf(Value),
    /// A nested node with its own record and children.
    Node(NodeId),
}

/// In-memory state of one directory node.
///
/// The payload map doubles as the key set: every key of the node is present
/// as a map key, cached values as `Some`. The cache therefore cannot hold an
/// entry outside the key set.
#[derive(Debug)]
pub(crate) struct NodeRecord {
    /// `%`-joined path relative to the root; empty for the root itself.
    pub stem: String,
    /// Directory levels remaining below this node. Fixed at creation.
    pub store_depth: u32,
    /// Key set and per-key cache.
    pub payload: BTreeMap<String, Option<Slot>>,
    /// Set once every key has been materialized; reset by `clear`.
    pub all_cached: bool,
}

impl NodeRecord {
    /// Fresh record with an empty key set.
    pub fn new(stem: String, store_depth: u32) -> Self {
        Self {
            stem,
            store_depth,
            payload: BTreeMap::new(),
            all_cached: false,
        }
    }

    /// Record seeded with the keys of a metadata record, nothing cached.
    pub fn with_keys(stem: String, store_depth: u32, keys: Vec<String>) -> Self {
        let payload = keys.into_iter().map(|k| (k, None)).collect();
        Self {
            stem,
            store_depth,
            payload,
            all_cached: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.stem.is_empty()
    }
}

/// Slab arena of node records with a free list.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<NodeRecord>>,
    free: Vec<usize>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, reusing a freed slot when one is available.
    pub fn insert(&mut self, record: NodeRecord) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(record);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(record));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Release a record, returning it. Panics on a dangling handle.
    pub fn remove(&mut self, id: NodeId) -> NodeRecord {
        let record = self.slots[id.0].take().expect("dangling NodeId");
        self.free.push(id.0);
        record
    }

    /// Panics on a dangling handle.
    pub fn get(&self, id: NodeId) -> &NodeRecord {
        self.slots[id.0].as_ref().expect("dangling NodeId")
    }

    /// Panics on a dangling handle.
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeRecord {
        self.slots[id.0].as_mut().expect("dangling NodeId")
    }
}
