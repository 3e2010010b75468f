//! On-disk naming for tree nodes.
//!
//! A stored tree lives in a single operating-system directory (the root).
//! Logical hierarchy is encoded in file names: a node's *stem* is its
//! `%`-joined path relative to the root. No nested OS directories are
//! created.
//!
//! For a node with stem `s`:
//! - its metadata record lives at `<root>/<s>.meta` (the root's at
//!   `<root>/root.meta`),
//! - a leaf child `k` lives at `<root>/<s>%<sanitize(k)>`.
//!
//! Keys are sanitized before entering a file name; the raw key is preserved
//! in the metadata record. Sanitization is not injective (`"a b"` and
//! `"a_b"` collide on disk) and is never reversed.
//!
//! Keys that land in the metadata namespace are a documented limitation of
//! the format: a leaf key sanitizing to `root.meta` (or any name ending in
//! [`META_SUFFIX`]) shadows a metadata file, and a *nested* root-level key
//! named `root` puts its record at `<root>/root.meta`, colliding with the
//! root's own record.

use std::path::{Path, PathBuf};

/// Reserved character joining stem segments. Never appears in a sanitized key.
pub const SEPARATOR: char = '%';

/// Suffix of every metadata file.
pub const META_SUFFIX: &str = ".meta";

/// Basename (before the suffix) of the root's metadata file.
pub const ROOT_META_STEM: &str = "root";

/// Characters replaced by `_` when a key becomes part of a file name:
/// spaces, the separator itself, and path separators.
const FORBIDDEN_CHARS: &[char] = &[' ', SEPARATOR, '/', '\\'];

/// Sanitize a key for use in an on-disk name.
///
/// An empty key becomes `_`: an empty sanitized name would alias the
/// parent's own stem, and at the root that is the root's metadata record.
///
/// Not injective, and not reversed on read: distinct keys may collide on
/// disk. The metadata record keeps the raw key.
///
/// # Examples
///
/// ```
/// use arbor_store::layout::sanitize;
///
/// assert_eq!(sanitize("plain"), "plain");
/// assert_eq!(sanitize("two words"), "two_words");
/// assert_eq!(sanitize("50%"), "50_");
/// assert_eq!(sanitize(""), "_");
/// ```
pub fn sanitize(key: &str) -> String {
    if key.is_empty() {
        return "_".to_string();
    }
    key.replace(FORBIDDEN_CHARS, "_")
}

/// Stem of the child reached by `key` from the node with stem `stem`.
///
/// The root's stem is empty; its children join with no separator.
///
/// # Examples
///
/// ```
/// use arbor_store::layout::child_stem;
///
/// assert_eq!(child_stem("", "a"), "a");
/// assert_eq!(child_stem("a", "b"), "a%b");
/// ```
pub fn child_stem(stem: &str, key: &str) -> String {
    let key = sanitize(key);
    if stem.is_empty() {
        key
    } else {
        format!("{stem}{SEPARATOR}{key}")
    }
}

/// Path of the metadata file for the node with stem `stem` under `root`.
pub fn meta_path(root: &Path, stem: &str) -> PathBuf {
    if stem.is_empty() {
        root.join(format!("{ROOT_META_STEM}{META_SUFFIX}"))
    } else {
        root.join(format!("{stem}{META_SUFFIX}"))
    }
}

/// Path of the leaf file for the node with stem `stem` under `root`.
///
/// Only meaningful for non-empty stems: the root itself is a directory,
/// never a leaf file.
pub fn data_path(root: &Path, stem: &str) -> PathBuf {
    root.join(stem)
}
