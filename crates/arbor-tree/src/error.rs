//! Error types for the tree crate.

use std::path::PathBuf;

/// Errors that can occur while operating on a lazy tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The requested key is not in the node's key set.
    ///
    /// Raised before any filesystem access.
    #[error("key not found: {key:?}")]
    KeyNotFound { key: String },

    /// `load` was given a path that does not refer to an existing directory.
    #[error("no stored tree at {path}")]
    RootNotFound { path: PathBuf },

    /// A key is listed in a node's metadata record but has neither a leaf
    /// file nor a child record on disk.
    #[error("key {key:?} has no data on disk at {path}")]
    MissingChild { key: String, path: PathBuf },

    /// `create` was given a path where something already exists.
    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },

    /// A root cannot have store depth zero: a depth-zero tree is a single
    /// file, not a directory.
    #[error("store depth must be at least 1 for a tree root")]
    DepthTooShallow,

    /// `write` was invoked on a node other than the root. Writes proceed
    /// strictly root-to-leaf.
    #[error("write is only valid on the root node")]
    NotRoot,

    /// Format-layer failure.
    #[error("store error: {0}")]
    Store(#[from] arbor_store::StoreError),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for tree results.
pub type Result<T> = std::result::Result<T, TreeError>;
