//! JSON file I/O with write-temp-then-rename semantics.
//!
//! [`write_json_atomic`] serializes to a uniquely named temporary file in the
//! target's directory and persists it over the target, so readers see either
//! the previous content or the new content, never a partial file. Concurrent
//! writers to one path each get their own temporary file; the last rename
//! wins. A crash mid-write leaves the previous version in place.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{Result, StoreError};

/// Pretty-print `value` as JSON (two-space indent).
pub fn to_json_string<T: Serialize>(value: &T) -> String {
    // Store records are plain data with string keys.
    serde_json::to_string_pretty(value).expect("store records are always JSON-serializable")
}

/// Atomically replace `path` with the JSON encoding of `value`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    if let Err(e) = tmp
        .write_all(to_json_string(value).as_bytes())
        .and_then(|()| tmp.flush())
    {
        return Err(StoreError::io(tmp.path(), e));
    }

    // A failed persist drops the temporary file with the error.
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Read and decode a JSON record.
///
/// A missing file is [`StoreError::NotFound`]; undecodable content is
/// [`StoreError::CorruptRecord`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound {
            what: path.display().to_string(),
        },
        _ => StoreError::io(path, e),
    })?;

    serde_json::from_str(&content).map_err(|source| StoreError::CorruptRecord {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove `dir` if it is empty. Returns whether it was removed.
///
/// Failures are swallowed: a directory that cannot be listed or removed is
/// simply left in place.
pub fn remove_dir_if_empty(dir: &Path) -> bool {
    let is_empty = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => return false,
    };
    is_empty && fs::remove_dir(dir).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
