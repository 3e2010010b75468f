use std::path::PathBuf;

/// Errors from the on-disk format layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A metadata record carries a format version this build does not read.
    #[error("unsupported metadata format version {found} at {path}")]
    UnsupportedVersion { found: u64, path: PathBuf },

    /// A metadata record carries a store depth outside the valid range.
    ///
    /// Depth is non-negative by construction in the API; this can only
    /// arrive from a hand-edited or foreign record on disk.
    #[error("invalid store depth {found} at {path}")]
    InvalidDepth { found: i64, path: PathBuf },

    /// A key-set update was attempted before any record was written.
    ///
    /// Keys can only be updated after an initial bulk write established
    /// the record for this node.
    #[error("no metadata record at {path}; node was never written")]
    MetaMissing { path: PathBuf },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for format-layer operations.
pub type StoreResult<T> = Result<T, StoreError>;
