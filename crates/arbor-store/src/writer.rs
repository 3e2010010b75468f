//! Recursive bulk dump of an in-memory value into the on-disk layout.
//!
//! The writer walks a `serde_json::Value` with a depth budget. While the
//! budget lasts and the value at hand is a JSON object, the object becomes a
//! directory node: one metadata record plus one on-disk child per key. When
//! the budget hits zero, or the value is not an object, the whole value is
//! serialized into a single leaf file and no further splitting occurs.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::layout;
use crate::meta::{self, MetaRecord};

/// Write `value` at stem `stem` under `root` with `depth` directory levels
/// remaining.
///
/// With an empty stem the value must be a JSON object and `depth` must be
/// positive (the root of a stored tree is always a directory node);
/// [`dump_path`] routes every other top-level shape to a single file.
///
/// When a stem changes shape between writes (leaf became node or the
/// reverse), the stale artifact of the old shape is removed so it cannot
/// shadow the new one. Deeper debris from an earlier, larger subtree is
/// left in place; it is unreachable once no metadata record lists it.
pub fn write_value(root: &Path, stem: &str, value: &Value, depth: u32) -> StoreResult<()> {
    match value {
        Value::Object(map) if depth > 0 => {
            let keys: Vec<String> = map.keys().cloned().collect();
            meta::write(root, stem, &MetaRecord::new(keys, depth))?;
            remove_stale_leaf(root, stem)?;

            for (key, child) in map {
                let child_stem = layout::child_stem(stem, key);
                write_value(root, &child_stem, child, depth - 1)?;
            }
            Ok(())
        }
        _ => {
            let path = layout::data_path(root, stem);
            let bytes = serde_json::to_vec(value)?;
            meta::write_atomic(&path, &bytes)?;
            remove_stale_meta(root, stem)?;
            debug!(path = %path.display(), len = bytes.len(), "leaf write");
            Ok(())
        }
    }
}

/// Top-level bulk dump of `value` to the path `dest`.
///
/// With `append = false`, anything already at `dest` (directory or file) is
/// deleted first. With `append = true` the destination directory is kept;
/// files from an earlier dump that the new metadata does not list stay on
/// disk untouched and unreferenced.
///
/// When `depth` is zero or `value` is not a JSON object, `dest` becomes a
/// single file holding the fully serialized value and no directory is
/// created.
pub fn dump_path(value: &Value, dest: &Path, depth: u32, append: bool) -> StoreResult<()> {
    if !append {
        if dest.is_dir() {
            fs::remove_dir_all(dest)?;
        } else if dest.is_file() {
            fs::remove_file(dest)?;
        }
    }

    if depth > 0 && value.is_object() {
        fs::create_dir_all(dest)?;
        write_value(dest, "", value, depth)?;
        debug!(dest = %dest.display(), depth, "bulk dump complete");
    } else {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec(value)?;
        meta::write_atomic(dest, &bytes)?;
        debug!(dest = %dest.display(), "single-file dump");
    }
    Ok(())
}

/// A former directory node at `stem` was overwritten by a leaf; drop its
/// metadata record so the leaf is not shadowed on read.
fn remove_stale_meta(root: &Path, stem: &str) -> StoreResult<()> {
    if stem.is_empty() {
        return Ok(());
    }
    let path = layout::meta_path(root, stem);
    if path.is_file() {
        warn!(path = %path.display(), "removing stale metadata record");
        fs::remove_file(&path)?;
    }
    Ok(())
}

/// A former leaf at `stem` became a directory node; drop the old leaf file.
fn remove_stale_leaf(root: &Path, stem: &str) -> StoreResult<()> {
    if stem.is_empty() {
        return Ok(());
    }
    let path = layout::data_path(root, stem);
    if path.is_file() {
        warn!(path = %path.display(), "removing stale leaf file");
        fs::remove_file(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_json(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn depth_one_splits_only_the_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let value = json!({"a": {"b": 1, "c": 2}, "d": 3});

        dump_path(&value, &dest, 1, false).unwrap();

        let root_meta = read_json(&dest.join("root.meta"));
        assert_eq!(root_meta["keys"], json!(["a", "d"]));
        assert_eq!(root_meta["store_depth"], json!(1));

        // Child depth reached 0: "a" is one leaf file, no further splitting.
        assert_eq!(read_json(&dest.join("a")), json!({"b": 1, "c": 2}));
        assert_eq!(read_json(&dest.join("d")), json!(3));
        assert!(!dest.join("a.meta").exists());
    }

    #[test]
    fn depth_two_splits_nested_objects() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let value = json!({"a": {"b": 1, "c": 2}, "d": 3});

        dump_path(&value, &dest, 2, false).unwrap();

        let a_meta = read_json(&dest.join("a.meta"));
        assert_eq!(a_meta["keys"], json!(["b", "c"]));
        assert_eq!(a_meta["store_depth"], json!(1));

        assert_eq!(read_json(&dest.join("a%b")), json!(1));
        assert_eq!(read_json(&dest.join("a%c")), json!(2));
        assert_eq!(read_json(&dest.join("d")), json!(3));
        assert!(!dest.join("a").exists());
    }

    #[test]
    fn depth_zero_produces_exactly_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let value = json!({"a": {"b": 1}, "d": 3});

        dump_path(&value, &dest, 0, false).unwrap();

        assert!(dest.is_file());
        assert_eq!(read_json(&dest), value);
    }

    #[test]
    fn non_object_top_level_produces_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        dump_path(&json!([1, 2, 3]), &dest, 3, false).unwrap();

        assert!(dest.is_file());
        assert_eq!(read_json(&dest), json!([1, 2, 3]));
    }

    #[test]
    fn arrays_and_scalars_are_leaves_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let value = json!({"list": [1, 2], "s": "text", "n": null});

        dump_path(&value, &dest, 5, false).unwrap();

        assert_eq!(read_json(&dest.join("list")), json!([1, 2]));
        assert_eq!(read_json(&dest.join("s")), json!("text"));
        assert_eq!(read_json(&dest.join("n")), json!(null));
    }

    #[test]
    fn empty_key_does_not_clobber_the_parent_record() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let value = json!({"": {"x": 1}});

        dump_path(&value, &dest, 2, false).unwrap();

        // The root record names the empty key; the child's record lives at
        // the sanitized stem, not at root.meta.
        let root_meta = read_json(&dest.join("root.meta"));
        assert_eq!(root_meta["keys"], json!([""]));
        assert_eq!(root_meta["store_depth"], json!(2));

        let child_meta = read_json(&dest.join("_.meta"));
        assert_eq!(child_meta["keys"], json!(["x"]));
        assert_eq!(read_json(&dest.join("_%x")), json!(1));
    }

    #[test]
    fn keys_with_spaces_are_sanitized_in_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let value = json!({"two words": 1});

        dump_path(&value, &dest, 1, false).unwrap();

        assert!(dest.join("two_words").is_file());
        // The record keeps the raw key.
        let root_meta = read_json(&dest.join("root.meta"));
        assert_eq!(root_meta["keys"], json!(["two words"]));
    }

    #[test]
    fn overwrite_destroys_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("unrelated"), b"old").unwrap();

        dump_path(&json!({"a": 1}), &dest, 1, false).unwrap();

        assert!(!dest.join("unrelated").exists());
        assert_eq!(read_json(&dest.join("a")), json!(1));
    }

    #[test]
    fn append_preserves_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("unrelated"), b"old").unwrap();

        dump_path(&json!({"a": 1}), &dest, 1, true).unwrap();

        assert_eq!(fs::read(dest.join("unrelated")).unwrap(), b"old");
        assert_eq!(read_json(&dest.join("a")), json!(1));
    }

    #[test]
    fn overwrite_replaces_a_plain_file_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        fs::write(&dest, b"old").unwrap();

        dump_path(&json!({"a": 1}), &dest, 1, false).unwrap();

        assert!(dest.is_dir());
        assert_eq!(read_json(&dest.join("a")), json!(1));
    }

    #[test]
    fn node_written_over_leaf_removes_the_leaf_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        dump_path(&json!({"a": 1}), &dest, 2, false).unwrap();
        assert!(dest.join("a").is_file());

        dump_path(&json!({"a": {"b": 2}}), &dest, 2, true).unwrap();

        assert!(!dest.join("a").exists());
        assert!(dest.join("a.meta").is_file());
        assert_eq!(read_json(&dest.join("a%b")), json!(2));
    }

    #[test]
    fn leaf_written_over_node_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        dump_path(&json!({"a": {"b": 2}}), &dest, 2, false).unwrap();
        assert!(dest.join("a.meta").is_file());

        dump_path(&json!({"a": 1}), &dest, 2, true).unwrap();

        assert!(!dest.join("a.meta").exists());
        assert_eq!(read_json(&dest.join("a")), json!(1));
    }

    #[test]
    fn empty_object_is_a_record_with_no_children() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");

        dump_path(&json!({}), &dest, 1, false).unwrap();

        let root_meta = read_json(&dest.join("root.meta"));
        assert_eq!(root_meta["keys"], json!([]));
        let entries: Vec<_> = fs::read_dir(&dest).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
