//! Id-to-scene lookup over a loaded scene set.
//!
//! Scene ids are expected to be unique within a character, but the store
//! cannot guarantee it for hand-edited data. [`SceneIndex`] keeps the
//! last-registered record for each id (matching manifest order) and remembers
//! every id that was declared more than once so callers can refuse to act on
//! ambiguous records.

use std::collections::{BTreeSet, HashMap};

use fable_store::model::{Scene, SceneEntry};

/// A scene together with the path it was loaded from.
#[derive(Debug, Clone, Copy)]
pub struct IndexedScene<'a> {
    pub file_path: &'a str,
    pub scene: &'a Scene,
}

/// Borrowed id-to-scene lookup.
#[derive(Debug, Default)]
pub struct SceneIndex<'a> {
    by_id: HashMap<&'a str, IndexedScene<'a>>,
    duplicates: BTreeSet<String>,
}

impl<'a> SceneIndex<'a> {
    /// Index `entries` in order; later entries shadow earlier ones with the same id.
    pub fn from_entries(entries: &'a [SceneEntry]) -> Self {
        let mut index = SceneIndex::default();
        for entry in entries {
            let indexed = IndexedScene {
                file_path: &entry.file_path,
                scene: &entry.scene,
            };
            if let Some(previous) = index.by_id.insert(entry.scene.id.as_str(), indexed) {
                tracing::warn!(
                    scene_id = %entry.scene.id,
                    first = %previous.file_path,
                    second = %entry.file_path,
                    "scene id declared by more than one file"
                );
                index.duplicates.insert(entry.scene.id.clone());
            }
        }
        index
    }

    pub fn get(&self, id: &str) -> Option<IndexedScene<'a>> {
        self.by_id.get(id).copied()
    }

    pub fn scene(&self, id: &str) -> Option<&'a Scene> {
        self.get(id).map(|s| s.scene)
    }

    pub fn file_path(&self, id: &str) -> Option<&'a str> {
        self.get(id).map(|s| s.file_path)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Ids declared by more than one file.
    pub fn duplicates(&self) -> &BTreeSet<String> {
        &self.duplicates
    }

    pub fn is_duplicate(&self, id: &str) -> bool {
        self.duplicates.contains(id)
    }
}
