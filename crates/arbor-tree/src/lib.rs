//! Lazily-loaded, filesystem-backed JSON trees.
//!
//! Large nested structures are stored as a directory of many small files
//! (the on-disk format lives in `arbor-store`) and read back one key per
//! disk access instead of one monolithic document. The [`DumpOptions`]
//! store depth decides how many levels of nesting are split into per-key
//! files; below the budget, values collapse into single leaf files.
//!
//! ```
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir()?;
//! let dest = dir.path().join("out");
//! arbor_tree::dump(&json!({"a": {"b": 1, "c": 2}, "d": 3}), &dest)?;
//!
//! let mut tree = arbor_tree::load(&dest)?;
//! let root = tree.root();
//! assert!(tree.contains(root, "a"));
//! assert_eq!(tree.get(root, "d")?.as_leaf(), Some(&json!(3)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Mutations via [`Tree::set`] are in-memory until an explicit
//! [`Tree::write`] on the root. [`Tree::clear`] releases the cache so a
//! bulk traversal does not hold the whole tree in memory.
//!
//! Single writer, single reader at a time: there is no locking and no
//! cross-process coordination.

pub mod error;
mod node;
mod tree;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{Result, TreeError};
pub use node::NodeId;
pub use tree::{EntryRef, Tree};

use std::io;
use std::path::Path;

use serde_json::Value;

use arbor_store::writer;

/// Store depth used when none is given: split only the top level.
pub const DEFAULT_STORE_DEPTH: u32 = 1;

/// Options for [`dump_with`].
#[derive(Clone, Debug)]
pub struct DumpOptions {
    /// Directory levels to split before collapsing into leaf files.
    pub store_depth: u32,
    /// Keep an existing destination directory instead of deleting it first.
    pub append: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            store_depth: DEFAULT_STORE_DEPTH,
            append: false,
        }
    }
}

/// Open the stored tree rooted at `path`.
///
/// See [`Tree::load`]. For a plain JSON stream use [`load_reader`].
pub fn load(path: impl AsRef<Path>) -> Result<Tree> {
    Tree::load(path)
}

/// Parse one JSON document from an open reader. No lazy tree is involved.
pub fn load_reader<R: io::Read>(reader: R) -> Result<Value> {
    Ok(serde_json::from_reader(reader)?)
}

/// Dump `value` to the path `dest` with default options.
pub fn dump(value: &Value, dest: impl AsRef<Path>) -> Result<()> {
    dump_with(value, dest, DumpOptions::default())
}

/// Dump `value` to the path `dest`.
///
/// With `append = false`, anything already at `dest` is deleted first.
/// With store depth 0, or a non-object `value`, `dest` becomes a single
/// file holding the whole document and no directory is created.
pub fn dump_with(value: &Value, dest: impl AsRef<Path>, options: DumpOptions) -> Result<()> {
    writer::dump_path(value, dest.as_ref(), options.store_depth, options.append)?;
    Ok(())
}

/// Serialize `value` as one JSON document to an open writer.
pub fn dump_writer<W: io::Write>(value: &Value, out: W) -> Result<()> {
    Ok(serde_json::to_writer(out, value)?)
}
