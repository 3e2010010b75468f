//! On-disk format for Arbor trees.
//!
//! A stored tree is one operating-system directory holding many small JSON
//! files. Logical hierarchy lives in file names, joined by the reserved
//! separator `%`; no nested OS directories are created. A dump of
//! `{"a": {"b": 1, "c": 2}, "d": 3}` at store depth 2 produces:
//!
//! ```text
//! out/root.meta    {"version":1,"keys":["a","d"],"store_depth":2}
//! out/a.meta       {"version":1,"keys":["b","c"],"store_depth":1}
//! out/a%b          1
//! out/a%c          2
//! out/d            3
//! ```
//!
//! This crate is the stateless format layer: naming ([`layout`]), metadata
//! records ([`meta`]), and the recursive bulk writer ([`writer`]). The lazy,
//! stateful view over a stored tree lives in `arbor-tree`.
//!
//! # Design Rules
//!
//! 1. The raw key lives in the metadata record; the file name carries the
//!    sanitized form. Sanitization is never reversed.
//! 2. The stored depth of a node is fixed at creation; key-set updates
//!    preserve it.
//! 3. Individual file writes are atomic (temp file + rename); whole-tree
//!    dumps are not transactional.
//! 4. Single writer, single reader at a time. No locking, no cross-process
//!    coordination.

pub mod error;
pub mod layout;
pub mod meta;
pub mod writer;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use meta::{MetaRecord, FORMAT_VERSION};
