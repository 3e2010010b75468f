//! The lazy tree: mapping operations over a stored root directory.
//!
//! A [`Tree`] owns the arena of node records for one stored tree. Mapping
//! operations take a [`NodeId`]; [`Tree::root`] hands out the root's handle.
//! Children are materialized from disk on first access and cached; `set`
//! mutates only the in-memory payload until an explicit [`Tree::write`].

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use arbor_store::{layout, meta, writer};

use crate::error::{Result, TreeError};
use crate::node::{Arena, NodeId, NodeRecord, Slot};

/// View of one cached entry: a plain value or a nested node.
#[derive(Debug)]
pub enum EntryRef<'a> {
    /// A leaf value, loaded whole from one file.
    Leaf(&'a Value),
    /// A nested node; pass the handle back to the tree's methods.
    Node(NodeId),
}

impl<'a> EntryRef<'a> {
    /// The leaf value, if this entry is a leaf.
    pub fn as_leaf(&self) -> Option<&'a Value> {
        match self {
            Self::Leaf(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    /// The node handle, if this entry is a nested node.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Leaf(_) => None,
            Self::Node(id) => Some(*id),
        }
    }
}

/// A lazily-loaded, filesystem-backed JSON tree.
pub struct Tree {
    /// The root directory on disk.
    root_dir: PathBuf,
    /// All node records of this tree.
    arena: Arena,
    /// Handle of the root node.
    root: NodeId,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root_dir", &self.root_dir)
            .field("keys", &self.len(self.root))
            .finish()
    }
}

impl Tree {
    /// Create a brand-new tree rooted at `path`.
    ///
    /// Fails with [`TreeError::AlreadyExists`] if anything (file or
    /// directory) is already at `path`, and with
    /// [`TreeError::DepthTooShallow`] for `store_depth == 0` (a depth-zero
    /// tree is a single file and cannot be a root). Both checks run before
    /// any side effect. The metadata record is first written by
    /// [`Tree::write`].
    pub fn create(path: impl AsRef<Path>, store_depth: u32) -> Result<Self> {
        let path = path.as_ref();
        if store_depth == 0 {
            return Err(TreeError::DepthTooShallow);
        }
        if path.exists() {
            return Err(TreeError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        fs::create_dir_all(path)?;

        let mut arena = Arena::new();
        let root = arena.insert(NodeRecord::new(String::new(), store_depth));
        debug!(path = %path.display(), store_depth, "tree created");
        Ok(Self {
            root_dir: path.to_path_buf(),
            arena,
            root,
        })
    }

    /// Open the stored tree rooted at `path`.
    ///
    /// The path must refer to an existing directory. The root's metadata
    /// record is read immediately; a directory without one loads as an
    /// empty root at the default store depth (a fresh root that was never
    /// written).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(TreeError::RootNotFound {
                path: path.to_path_buf(),
            });
        }

        let record = match meta::read(path, "")? {
            Some(record) => {
                debug!(path = %path.display(), keys = record.keys.len(), depth = record.store_depth, "tree opened");
                NodeRecord::with_keys(String::new(), record.store_depth, record.keys)
            }
            None => NodeRecord::new(String::new(), crate::DEFAULT_STORE_DEPTH),
        };

        let mut arena = Arena::new();
        let root = arena.insert(record);
        Ok(Self {
            root_dir: path.to_path_buf(),
            arena,
            root,
        })
    }

    /// Handle of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root directory on disk.
    pub fn path(&self) -> &Path {
        &self.root_dir
    }

    /// Store depth of `node` (directory levels remaining below it).
    pub fn store_depth(&self, node: NodeId) -> u32 {
        self.arena.get(node).store_depth
    }

    /// Number of keys in `node`'s key set.
    pub fn len(&self, node: NodeId) -> usize {
        self.arena.get(node).payload.len()
    }

    /// Returns `true` if `node` has no keys.
    pub fn is_empty(&self, node: NodeId) -> bool {
        self.arena.get(node).payload.is_empty()
    }

    /// Whether `key` is in `node`'s key set. Never touches disk.
    pub fn contains(&self, node: NodeId, key: &str) -> bool {
        self.arena.get(node).payload.contains_key(key)
    }

    /// The current key set of `node`. Never touches disk.
    pub fn keys(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.arena.get(node).payload.keys().map(String::as_str)
    }

    /// Get the value under `key`, materializing it from disk on first
    /// access.
    ///
    /// Fails with [`TreeError::KeyNotFound`] (before any filesystem access)
    /// when `key` is outside the key set, and with
    /// [`TreeError::MissingChild`] when the key is listed but has neither a
    /// leaf file nor a child record on disk.
    pub fn get(&mut self, node: NodeId, key: &str) -> Result<EntryRef<'_>> {
        if !self.contains(node, key) {
            return Err(TreeError::KeyNotFound {
                key: key.to_string(),
            });
        }
        self.ensure_cached(node, key)?;

        let slot = self.arena.get(node).payload[key]
            .as_ref()
            .expect("slot cached above");
        Ok(entry_ref(slot))
    }

    /// Set `key` to a leaf `value`, adding the key to the key set if new.
    ///
    /// Purely in-memory: visible to `get`/`keys` immediately, persisted
    /// only by [`Tree::write`]. Overwriting a cached child node releases
    /// its records back to the arena; handles to them are invalidated.
    pub fn set(&mut self, node: NodeId, key: impl Into<String>, value: Value) {
        let record = self.arena.get_mut(node);
        let replaced = record.payload.insert(key.into(), Some(Slot::Leaf(value)));
        if let Some(Some(Slot::Node(child))) = replaced {
            self.release(child);
        }
    }

    /// Views of every value of `node`, materializing any not yet cached.
    pub fn values(&mut self, node: NodeId) -> Result<Vec<EntryRef<'_>>> {
        self.cache_all(node)?;
        Ok(self
            .arena
            .get(node)
            .payload
            .values()
            .map(|slot| entry_ref(slot.as_ref().expect("all keys cached")))
            .collect())
    }

    /// Key/value views of every entry of `node`, materializing any not yet
    /// cached.
    pub fn items(&mut self, node: NodeId) -> Result<Vec<(&str, EntryRef<'_>)>> {
        self.cache_all(node)?;
        Ok(self
            .arena
            .get(node)
            .payload
            .iter()
            .map(|(key, slot)| {
                (
                    key.as_str(),
                    entry_ref(slot.as_ref().expect("all keys cached")),
                )
            })
            .collect())
    }

    /// Discard `node`'s cached payload so subsequent access re-reads from
    /// disk. The key set is kept.
    ///
    /// Descendant records are released back to the arena: handles to them
    /// obtained before the call are invalidated. Bounds memory after a bulk
    /// traversal.
    pub fn clear(&mut self, node: NodeId) {
        let record = self.arena.get_mut(node);
        let mut children = Vec::new();
        for slot in record.payload.values_mut() {
            if let Some(Slot::Node(child)) = slot.take() {
                children.push(child);
            }
        }
        record.all_cached = false;

        for child in children {
            self.release(child);
        }
    }

    /// Return `id` and every descendant record to the arena's free list.
    fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let record = self.arena.remove(id);
            for slot in record.payload.into_values().flatten() {
                if let Slot::Node(child) = slot {
                    pending.push(child);
                }
            }
        }
    }

    /// Materialize the whole subtree under `node` into one in-memory value.
    pub fn to_value(&mut self, node: NodeId) -> Result<Value> {
        self.cache_all(node)?;
        let snapshot: Vec<(String, Slot)> = self
            .arena
            .get(node)
            .payload
            .iter()
            .map(|(key, slot)| {
                (
                    key.clone(),
                    slot.clone().expect("all keys cached"),
                )
            })
            .collect();

        let mut map = Map::new();
        for (key, slot) in snapshot {
            let value = match slot {
                Slot::Leaf(value) => value,
                Slot::Node(child) => self.to_value(child)?,
            };
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    /// Persist in-memory state to disk. Valid only on the root node.
    ///
    /// With no metadata record on disk yet, performs one full bulk dump of
    /// the in-memory payload at the root's configured depth. Once a record
    /// exists, takes the update path instead: the current key set is
    /// persisted, every cached child node updates itself recursively, and
    /// every cached leaf value is re-serialized. Keys never materialized
    /// into the cache are left untouched on disk.
    pub fn write(&mut self, node: NodeId) -> Result<()> {
        if !self.arena.get(node).is_root() {
            return Err(TreeError::NotRoot);
        }

        if meta::read(&self.root_dir, "")?.is_none() {
            let depth = self.arena.get(node).store_depth;
            if depth == 0 {
                // Can only arrive from a foreign record; a created root
                // always has depth >= 1.
                return Err(TreeError::DepthTooShallow);
            }
            let value = self.to_value(node)?;
            writer::write_value(&self.root_dir, "", &value, depth)?;
            debug!(root = %self.root_dir.display(), depth, "initial bulk write");
            Ok(())
        } else {
            self.update(node)
        }
    }

    /// Cache the value under `key`, reading from disk if needed.
    fn ensure_cached(&mut self, node: NodeId, key: &str) -> Result<()> {
        if self.arena.get(node).payload[key].is_some() {
            return Ok(());
        }

        let stem = layout::child_stem(&self.arena.get(node).stem, key);
        let data = layout::data_path(&self.root_dir, &stem);
        let slot = if data.is_file() {
            let bytes = fs::read(&data)?;
            debug!(key, path = %data.display(), "leaf cached");
            Slot::Leaf(serde_json::from_slice(&bytes)?)
        } else if let Some(record) = meta::read(&self.root_dir, &stem)? {
            debug!(key, stem = %stem, depth = record.store_depth, "child node opened");
            let child = self.arena.insert(NodeRecord::with_keys(
                stem,
                record.store_depth,
                record.keys,
            ));
            Slot::Node(child)
        } else {
            return Err(TreeError::MissingChild {
                key: key.to_string(),
                path: data,
            });
        };

        self.arena
            .get_mut(node)
            .payload
            .insert(key.to_string(), Some(slot));
        Ok(())
    }

    /// Materialize every key of `node`, memoized via the all-cached flag.
    fn cache_all(&mut self, node: NodeId) -> Result<()> {
        if self.arena.get(node).all_cached {
            return Ok(());
        }
        let keys: Vec<String> = self.arena.get(node).payload.keys().cloned().collect();
        for key in &keys {
            self.ensure_cached(node, key)?;
        }
        self.arena.get_mut(node).all_cached = true;
        Ok(())
    }

    /// Update path of [`Tree::write`]: persist the key set, then recurse
    /// over cached children.
    fn update(&mut self, node: NodeId) -> Result<()> {
        let (stem, depth, keys) = {
            let record = self.arena.get(node);
            (
                record.stem.clone(),
                record.store_depth,
                record.payload.keys().cloned().collect::<Vec<_>>(),
            )
        };
        meta::update_keys(&self.root_dir, &stem, keys)?;

        let cached: Vec<(String, Slot)> = self
            .arena
            .get(node)
            .payload
            .iter()
            .filter_map(|(key, slot)| slot.clone().map(|slot| (key.clone(), slot)))
            .collect();

        for (key, slot) in cached {
            match slot {
                Slot::Node(child) => self.update(child)?,
                Slot::Leaf(value) => {
                    let child_stem = layout::child_stem(&stem, &key);
                    writer::write_value(
                        &self.root_dir,
                        &child_stem,
                        &value,
                        depth.saturating_sub(1),
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn entry_ref(slot: &Slot) -> EntryRef<'_> {
    match slot {
        Slot::Leaf(value) => EntryRef::Leaf(value),
        Slot::Node(id) => EntryRef::Node(*id),
    }
}
