//! Path containment and identifier validation.
//!
//! [`safe_resolve`] is the one place a client-supplied relative path becomes a
//! filesystem path. It works lexically and never touches the filesystem, so a
//! rejected path cannot have side effects.

use std::path::{Component, Path, PathBuf};

use crate::{Result, StoreError};

/// Resolve `relative` against `root`, rejecting anything that escapes `root`.
///
/// `.` segments are dropped and `..` segments pop the previous segment. A
/// `..` with nothing left to pop, an absolute path, or a platform prefix is a
/// [`StoreError::PathTraversal`]. Resolving to `root` itself is allowed.
pub fn safe_resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut segments: Vec<&std::ffi::OsStr> = Vec::new();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => segments.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if segments.pop().is_none() {
                    return Err(traversal(relative));
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal(relative)),
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

/// Resolve a single directory name directly under `root`.
///
/// Used for character ids, which must name exactly one child directory.
pub fn resolve_child(root: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Ok(root.join(part)),
        _ => Err(traversal(name)),
    }
}

/// Whether `id` is a legal scene id: one or more ASCII letters, digits,
/// underscores or hyphens.
pub fn is_valid_scene_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Log a rejected path and build its error.
pub(crate) fn traversal(path: &str) -> StoreError {
    tracing::warn!(path = %path, "rejected path outside its root");
    StoreError::PathTraversal {
        path: path.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/stories/warrior")
    }

    // -- safe_resolve -------------------------------------------------------

    #[test]
    fn plain_file_resolves_under_root() {
        assert_eq!(
            safe_resolve(&root(), "w_001.json").unwrap(),
            root().join("w_001.json")
        );
    }

    #[test]
    fn nested_path_resolves_under_root() {
        assert_eq!(
            safe_resolve(&root(), "past/w_past_001.json").unwrap(),
            root().join("past").join("w_past_001.json")
        );
    }

    #[test]
    fn inner_parent_segments_are_normalized() {
        assert_eq!(
            safe_resolve(&root(), "past/../w_001.json").unwrap(),
            root().join("w_001.json")
        );
        assert_eq!(
            safe_resolve(&root(), "./a/./b.json").unwrap(),
            root().join("a").join("b.json")
        );
    }

    #[test]
    fn escaping_parent_segments_are_rejected() {
        for path in ["../mage/index.json", "a/../../x.json", "..", "../../etc/passwd"] {
            let err = safe_resolve(&root(), path).unwrap_err();
            assert!(
                matches!(err, StoreError::PathTraversal { .. }),
                "{path} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn absolute_path_is_rejected() {
        assert!(matches!(
            safe_resolve(&root(), "/etc/passwd"),
            Err(StoreError::PathTraversal { .. })
        ));
    }

    #[test]
    fn empty_path_resolves_to_root() {
        assert_eq!(safe_resolve(&root(), "").unwrap(), root());
    }

    // -- resolve_child ------------------------------------------------------

    #[test]
    fn child_must_be_single_segment() {
        let stories = PathBuf::from("/srv/stories");
        assert_eq!(
            resolve_child(&stories, "warrior").unwrap(),
            stories.join("warrior")
        );
        for bad in ["..", "a/b", "", ".", "/abs"] {
            assert!(resolve_child(&stories, bad).is_err(), "{bad:?} accepted");
        }
    }

    // -- scene ids ----------------------------------------------------------

    #[test]
    fn scene_id_character_class() {
        assert!(is_valid_scene_id("w_001"));
        assert!(is_valid_scene_id("Intro-2"));
        assert!(!is_valid_scene_id(""));
        assert!(!is_valid_scene_id("a b"));
        assert!(!is_valid_scene_id("../x"));
        assert!(!is_valid_scene_id("é"));
    }
}
