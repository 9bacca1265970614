//! Stories root and per-character directories.
//!
//! [`Stories`] addresses the root that holds one directory per character.
//! [`CharacterDir`] performs every read and write inside one character
//! directory; all relative paths go through [`safe_resolve`] first.
//!
//! Bulk reads ([`CharacterDir::load_entries`]) skip records whose file is
//! missing or unparseable and log a warning. Direct reads of a single record
//! surface the error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::io::{read_json, remove_dir_if_empty, write_json_atomic};
use crate::model::{Manifest, Scene, SceneEntry};
use crate::path::{resolve_child, safe_resolve, traversal};
use crate::{Result, StoreError};

/// File name of the manifest inside each character directory.
pub const MANIFEST_FILE: &str = "index.json";

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

/// Listing row for one character directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSummary {
    pub id: String,
    pub has_manifest: bool,
    pub scene_count: usize,
}

/// The directory holding every character's story.
#[derive(Debug, Clone)]
pub struct Stories {
    root: PathBuf,
}

impl Stories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Summaries of every character directory, sorted by id.
    ///
    /// A missing stories root yields an empty list. An unreadable manifest
    /// counts as zero scenes.
    pub fn list_characters(&self) -> Result<Vec<CharacterSummary>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let dir = CharacterDir::at(id.clone(), entry.path());
            let has_manifest = dir.has_manifest();
            let scene_count = if has_manifest {
                match dir.read_manifest() {
                    Ok(manifest) => manifest.scenes.len(),
                    Err(e) => {
                        tracing::warn!(character = %id, error = %e, "skipping unreadable manifest");
                        0
                    }
                }
            } else {
                0
            };
            summaries.push(CharacterSummary {
                id,
                has_manifest,
                scene_count,
            });
        }

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Address an existing character directory.
    pub fn character(&self, id: &str) -> Result<CharacterDir> {
        let dir = CharacterDir::at(id, resolve_child(&self.root, id)?);
        if !dir.root.is_dir() {
            return Err(StoreError::NotFound {
                what: format!("character '{id}'"),
            });
        }
        Ok(dir)
    }

    /// Create a character directory with an empty manifest.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if the directory exists.
    pub fn create_character(&self, id: &str) -> Result<CharacterDir> {
        let path = resolve_child(&self.root, id)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists {
                what: format!("character '{id}'"),
            });
        }
        fs::create_dir_all(&path).map_err(|e| StoreError::io(&path, e))?;

        let dir = CharacterDir::at(id, path);
        dir.write_manifest(&Manifest::new(id))?;
        tracing::info!(character = %id, "created character");
        Ok(dir)
    }
}

// ---------------------------------------------------------------------------
// CharacterDir
// ---------------------------------------------------------------------------

/// One character's directory: manifest plus scene files.
#[derive(Debug, Clone)]
pub struct CharacterDir {
    id: String,
    root: PathBuf,
}

impl CharacterDir {
    fn at(id: impl Into<String>, root: PathBuf) -> Self {
        Self {
            id: id.into(),
            root,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a scene path relative to this directory.
    ///
    /// A path that resolves to the directory itself does not name a scene
    /// file and is rejected like an escaping one.
    pub fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        let path = safe_resolve(&self.root, file_path)?;
        if path == self.root {
            return Err(traversal(file_path));
        }
        Ok(path)
    }

    // -- manifest -----------------------------------------------------------

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest_path().is_file()
    }

    pub fn read_manifest(&self) -> Result<Manifest> {
        read_json(&self.manifest_path()).map_err(|e| match e {
            StoreError::NotFound { .. } => StoreError::NotFound {
                what: format!("manifest for '{}'", self.id),
            },
            other => other,
        })
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        write_json_atomic(&self.manifest_path(), manifest)
    }

    // -- scenes -------------------------------------------------------------

    /// Whether a file exists at `file_path`.
    pub fn scene_exists(&self, file_path: &str) -> Result<bool> {
        Ok(self.resolve(file_path)?.is_file())
    }

    pub fn read_scene(&self, file_path: &str) -> Result<Scene> {
        let path = self.resolve(file_path)?;
        read_json(&path).map_err(|e| match e {
            StoreError::NotFound { .. } => StoreError::NotFound {
                what: format!("scene '{file_path}'"),
            },
            other => other,
        })
    }

    /// Atomically write a scene, creating intermediate directories.
    pub fn write_scene(&self, file_path: &str, scene: &Scene) -> Result<()> {
        let path = self.resolve(file_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        write_json_atomic(&path, scene)
    }

    /// Delete a scene file.
    pub fn remove_scene(&self, file_path: &str) -> Result<()> {
        let path = self.resolve(file_path)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                what: format!("scene '{file_path}'"),
            },
            _ => StoreError::io(&path, e),
        })
    }

    /// Move a scene to a new path.
    ///
    /// Writes `scene` at `to`, deletes `from`, then removes `from`'s directory
    /// if that left it empty. The character root itself is never removed.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if anything is already at
    /// `to`, listed in the manifest or not.
    pub fn move_scene(&self, from: &str, to: &str, scene: &Scene) -> Result<()> {
        let old_path = self.resolve(from)?;
        let new_path = self.resolve(to)?;
        if new_path.exists() {
            return Err(StoreError::AlreadyExists {
                what: format!("scene file '{to}'"),
            });
        }

        self.write_scene(to, scene)?;
        fs::remove_file(&old_path).map_err(|e| StoreError::io(&old_path, e))?;

        if let Some(old_dir) = old_path.parent() {
            if old_dir != self.root && remove_dir_if_empty(old_dir) {
                tracing::debug!(dir = %old_dir.display(), "removed empty scene directory");
            }
        }
        Ok(())
    }

    /// Load every scene the manifest lists, in manifest order.
    ///
    /// Paths that escape the directory, missing files and corrupt records are
    /// skipped with a warning.
    pub fn load_entries(&self, manifest: &Manifest) -> Vec<SceneEntry> {
        manifest
            .scenes
            .iter()
            .filter_map(|file_path| match self.read_scene(file_path) {
                Ok(scene) => Some(SceneEntry::new(file_path.clone(), scene)),
                Err(e) => {
                    tracing::warn!(
                        character = %self.id,
                        file_path = %file_path,
                        error = %e,
                        "skipping unreadable scene"
                    );
                    None
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
