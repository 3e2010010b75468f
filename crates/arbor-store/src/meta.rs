//! Per-node metadata records.
//!
//! Every directory node owns exactly one metadata file holding its key set
//! and the store depth in effect when the node was created. The stored depth
//! is fixed at creation time; [`update_keys`] replaces only the key list.
//!
//! On-disk form (JSON):
//!
//! ```text
//! {"version": 1, "keys": ["a", "d"], "store_depth": 1}
//! ```
//!
//! All writes go through a temp-file-then-rename helper, so a record is
//! either the old bytes or the new bytes, never a torn mix.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::layout;

/// The metadata format version this build reads and writes.
pub const FORMAT_VERSION: u64 = 1;

/// Persisted metadata of one directory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetaRecord {
    /// Format version; readers reject versions they do not understand.
    pub version: u64,
    /// Raw (unsanitized) keys of this node.
    pub keys: Vec<String>,
    /// Store depth at creation time. Never altered by key-set updates.
    pub store_depth: u32,
}

impl MetaRecord {
    /// New record at the current format version.
    pub fn new(keys: Vec<String>, store_depth: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            keys,
            store_depth,
        }
    }
}

/// Unvalidated on-disk shape. Depth is decoded through `i64` so a negative
/// value in a foreign record is reported as [`StoreError::InvalidDepth`]
/// rather than a generic decode failure.
#[derive(Deserialize)]
struct RawRecord {
    version: u64,
    keys: Vec<String>,
    store_depth: i64,
}

/// Read the metadata record of the node with stem `stem`.
///
/// Returns `None` when no record exists yet (a fresh root that was never
/// written).
pub fn read(root: &Path, stem: &str) -> StoreResult<Option<MetaRecord>> {
    let path = layout::meta_path(root, stem);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let raw: RawRecord = serde_json::from_slice(&bytes)?;
    if raw.version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: raw.version,
            path,
        });
    }
    let store_depth = u32::try_from(raw.store_depth).map_err(|_| StoreError::InvalidDepth {
        found: raw.store_depth,
        path,
    })?;

    Ok(Some(MetaRecord {
        version: raw.version,
        keys: raw.keys,
        store_depth,
    }))
}

/// Overwrite the metadata record of the node with stem `stem`.
pub fn write(root: &Path, stem: &str, record: &MetaRecord) -> StoreResult<()> {
    let path = layout::meta_path(root, stem);
    let bytes = serde_json::to_vec(record)?;
    write_atomic(&path, &bytes)?;
    debug!(path = %path.display(), keys = record.keys.len(), depth = record.store_depth, "meta write");
    Ok(())
}

/// Replace only the key list of an existing record, preserving the stored
/// depth and version.
///
/// Fails with [`StoreError::MetaMissing`] when no record exists: a node's
/// keys can only be updated after an initial bulk write established the
/// record.
pub fn update_keys(root: &Path, stem: &str, keys: Vec<String>) -> StoreResult<MetaRecord> {
    let mut record = read(root, stem)?.ok_or_else(|| StoreError::MetaMissing {
        path: layout::meta_path(root, stem),
    })?;
    record.keys = keys;
    write(root, stem, &record)?;
    Ok(record)
}

/// Write `bytes` to `path` via a named temp file in the same directory,
/// then rename over the target. Readers observe either the old file or the
/// new one.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let record = MetaRecord::new(vec!["a".into(), "d".into()], 2);
        write(dir.path(), "", &record).unwrap();

        let back = read(dir.path(), "").unwrap().unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn read_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(dir.path(), "").unwrap().is_none());
        assert!(read(dir.path(), "a%b").unwrap().is_none());
    }

    #[test]
    fn branch_record_lives_beside_root_record() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a", &MetaRecord::new(vec!["b".into()], 1)).unwrap();

        assert!(dir.path().join("a.meta").is_file());
        let back = read(dir.path(), "a").unwrap().unwrap();
        assert_eq!(back.keys, vec!["b".to_string()]);
    }

    #[test]
    fn update_keys_preserves_stored_depth() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "", &MetaRecord::new(vec!["a".into()], 3)).unwrap();

        let updated = update_keys(dir.path(), "", vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(updated.store_depth, 3);

        let back = read(dir.path(), "").unwrap().unwrap();
        assert_eq!(back.keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(back.store_depth, 3);
    }

    #[test]
    fn update_keys_without_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = update_keys(dir.path(), "", vec!["a".into()]);
        assert!(matches!(result, Err(StoreError::MetaMissing { .. })));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("root.meta"),
            br#"{"version": 99, "keys": [], "store_depth": 1}"#,
        )
        .unwrap();

        let result = read(dir.path(), "");
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn negative_depth_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("root.meta"),
            br#"{"version": 1, "keys": [], "store_depth": -1}"#,
        )
        .unwrap();

        let result = read(dir.path(), "");
        assert!(matches!(
            result,
            Err(StoreError::InvalidDepth { found: -1, .. })
        ));
    }

    #[test]
    fn malformed_record_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("root.meta"), b"not json").unwrap();

        let result = read(dir.path(), "");
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "", &MetaRecord::new(vec![], 1)).unwrap();
        write(dir.path(), "", &MetaRecord::new(vec!["a".into()], 1)).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
