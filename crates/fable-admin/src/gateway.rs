//! Validated authoring operations over the story tree.
//!
//! [`StoryGateway`] is the only writer. Every operation re-reads what it needs
//! from disk, validates the request, then writes; nothing survives between
//! calls. Requests are checked before the first write so a rejected request
//! leaves no partial change.
//!
//! Rules enforced here on top of the store:
//!
//! - Scene ids are letters, digits, `_` and `-`, and unique within a
//!   character (on create, and on update when the id changes).
//! - Every choice carries both a `text` and a `nextSceneId`.
//! - A scene path may not address the manifest file.
//! - Creating a scene lists it in the manifest; deleting one unlists it.
//!
//! There is no per-character lock. Two concurrent writers to the same
//! character race and the last manifest write wins.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use fable_graph::prelude::*;
use fable_graph::reachability::unreached;
use fable_store::character::{CharacterDir, CharacterSummary, Stories};
use fable_store::model::{nullable, Assets, Manifest, Scene, SceneEntry};
use fable_store::path::is_valid_scene_id;
use fable_store::StoreError;
use serde::{Deserialize, Serialize};

use crate::events::{ClientRegistry, StoryEvent};
use crate::{AdminError, Result};

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

/// A character's manifest together with every scene that could be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPayload {
    pub manifest: Manifest,
    pub scenes: Vec<SceneEntry>,
}

/// Partial manifest update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPatch {
    /// `Some(None)` (an explicit `null`) clears the default speaker.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_speaker: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_scene_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<String>>,
}

/// Body of a scene creation request: the scene itself plus placement options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScene {
    /// Prepended to `{id}.json` to form the file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Path of an existing scene whose `next` should point at the new one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_after: Option<String>,
    #[serde(flatten)]
    pub scene: Scene,
}

impl NewScene {
    pub fn new(scene: Scene) -> Self {
        Self {
            prefix: None,
            link_after: None,
            scene,
        }
    }

    /// The relative file path the scene will be written to.
    pub fn file_path(&self) -> String {
        let prefix = self.prefix.as_deref().unwrap_or_default();
        format!("{prefix}{}.json", self.scene.id)
    }
}

/// Outcome of a name normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Files moved, in scene discovery order.
    pub renamed: Vec<Rename>,
    /// Manifest paths left in place, in manifest order.
    pub unchanged: Vec<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a scene body before it is written.
fn validate_scene(scene: &Scene) -> Result<()> {
    if !is_valid_scene_id(&scene.id) {
        return Err(AdminError::Validation(format!(
            "invalid scene id '{}': use letters, digits, '_' or '-'",
            scene.id
        )));
    }
    for (i, choice) in scene.choices().iter().enumerate() {
        if choice.text.trim().is_empty() {
            return Err(AdminError::Validation(format!(
                "choice {} of scene '{}' has no text",
                i + 1,
                scene.id
            )));
        }
        if choice.next_scene_id.is_empty() {
            return Err(AdminError::Validation(format!(
                "choice {} of scene '{}' has no nextSceneId",
                i + 1,
                scene.id
            )));
        }
    }
    Ok(())
}

/// Check that `file_path` names a scene file inside `dir`.
fn check_scene_path(dir: &CharacterDir, file_path: &str) -> Result<()> {
    if dir.resolve(file_path)? == dir.manifest_path() {
        return Err(AdminError::Validation(format!(
            "'{file_path}' is the manifest, not a scene"
        )));
    }
    Ok(())
}

fn conflict_with(entries: &[SceneEntry], scene_id: &str, except_path: Option<&str>) -> Option<String> {
    entries
        .iter()
        .find(|e| e.scene.id == scene_id && Some(e.file_path.as_str()) != except_path)
        .map(|e| e.file_path.clone())
}

// ---------------------------------------------------------------------------
// StoryGateway
// ---------------------------------------------------------------------------

/// Validated, consistency-preserving access to the story tree.
#[derive(Debug)]
pub struct StoryGateway {
    stories: Stories,
    layout: LayoutConfig,
    events: Arc<ClientRegistry>,
}

impl StoryGateway {
    pub fn new(stories_root: impl AsRef<Path>, layout: LayoutConfig, events: Arc<ClientRegistry>) -> Self {
        Self {
            stories: Stories::new(stories_root.as_ref()),
            layout,
            events,
        }
    }

    pub fn stories_root(&self) -> &Path {
        self.stories.root()
    }

    fn publish(&self, event: StoryEvent) {
        let delivered = self.events.broadcast(&event);
        tracing::trace!(event = event.name(), delivered, "published story event");
    }

    /// The character directory and its manifest.
    fn open(&self, character: &str) -> Result<(CharacterDir, Manifest)> {
        let dir = self.stories.character(character)?;
        let manifest = dir.read_manifest()?;
        Ok((dir, manifest))
    }

    // -- characters ---------------------------------------------------------

    pub fn list_characters(&self) -> Result<Vec<CharacterSummary>> {
        Ok(self.stories.list_characters()?)
    }

    /// Create a character directory with an empty manifest.
    pub fn create_character(&self, character: &str) -> Result<CharacterSummary> {
        self.stories.create_character(character)?;
        self.publish(StoryEvent::CharacterCreated {
            character: character.to_owned(),
        });
        Ok(CharacterSummary {
            id: character.to_owned(),
            has_manifest: true,
            scene_count: 0,
        })
    }

    /// The manifest plus every listed scene that could be read.
    pub fn get_story(&self, character: &str) -> Result<StoryPayload> {
        let (dir, manifest) = self.open(character)?;
        let scenes = dir.load_entries(&manifest);
        Ok(StoryPayload { manifest, scenes })
    }

    /// Merge `patch` into the manifest.
    pub fn update_manifest(&self, character: &str, patch: ManifestPatch) -> Result<Manifest> {
        let (dir, mut manifest) = self.open(character)?;

        if let Some(scenes) = &patch.scenes {
            for file_path in scenes {
                check_scene_path(&dir, file_path)?;
            }
        }
        if let Some(start) = &patch.start_scene_id {
            if !start.is_empty() && !is_valid_scene_id(start) {
                return Err(AdminError::Validation(format!("invalid start scene id '{start}'")));
            }
        }

        if let Some(speaker) = patch.default_speaker {
            manifest.default_speaker = speaker;
        }
        if let Some(start) = patch.start_scene_id {
            manifest.start_scene_id = start;
        }
        if let Some(assets) = patch.assets {
            manifest.assets = Some(assets);
        }
        if let Some(scenes) = patch.scenes {
            manifest.scenes = scenes;
        }

        dir.write_manifest(&manifest)?;
        tracing::info!(character = %character, "updated manifest");
        self.publish(StoryEvent::ManifestUpdated {
            character: character.to_owned(),
        });
        Ok(manifest)
    }

    // -- scenes -------------------------------------------------------------

    /// Write a new scene, list it in the manifest and optionally link it as
    /// the `next` of an existing scene.
    pub fn create_scene(&self, character: &str, mut request: NewScene) -> Result<SceneEntry> {
        let (dir, mut manifest) = self.open(character)?;
        validate_scene(&request.scene)?;
        request.scene.strip_derived();

        let file_path = request.file_path();
        check_scene_path(&dir, &file_path)?;

        let entries = dir.load_entries(&manifest);
        if let Some(existing) = conflict_with(&entries, &request.scene.id, None) {
            return Err(AdminError::Conflict(format!(
                "scene id '{}' is already used by '{existing}'",
                request.scene.id
            )));
        }
        if dir.scene_exists(&file_path)? {
            return Err(AdminError::Conflict(format!("file '{file_path}' already exists")));
        }

        let parent = match request.link_after.as_deref().filter(|p| !p.is_empty()) {
            Some(parent_path) => {
                check_scene_path(&dir, parent_path)?;
                Some((parent_path, dir.read_scene(parent_path)?))
            }
            None => None,
        };

        dir.write_scene(&file_path, &request.scene)?;
        if !manifest.lists(&file_path) {
            manifest.scenes.push(file_path.clone());
            dir.write_manifest(&manifest)?;
        }
        tracing::info!(character = %character, file_path = %file_path, "created scene");
        self.publish(StoryEvent::SceneCreated {
            character: character.to_owned(),
            file_path: file_path.clone(),
        });

        if let Some((parent_path, mut parent_scene)) = parent {
            parent_scene.next = Some(request.scene.id.clone());
            dir.write_scene(parent_path, &parent_scene)?;
            tracing::info!(
                character = %character,
                file_path = %parent_path,
                next = %request.scene.id,
                "linked parent scene"
            );
            self.publish(StoryEvent::SceneUpdated {
                character: character.to_owned(),
                file_path: parent_path.to_owned(),
            });
        }

        Ok(SceneEntry::new(file_path, request.scene))
    }

    /// Read one scene by path. A corrupt file is an error here.
    pub fn read_scene(&self, character: &str, file_path: &str) -> Result<SceneEntry> {
        let dir = self.stories.character(character)?;
        check_scene_path(&dir, file_path)?;
        let scene = dir.read_scene(file_path)?;
        Ok(SceneEntry::new(file_path, scene))
    }

    /// Overwrite an existing scene file.
    ///
    /// The current file may be corrupt; it is replaced. Changing the scene's
    /// id requires that no other file declares the new one.
    pub fn update_scene(&self, character: &str, file_path: &str, mut scene: Scene) -> Result<SceneEntry> {
        let (dir, manifest) = self.open(character)?;
        check_scene_path(&dir, file_path)?;
        validate_scene(&scene)?;
        scene.strip_derived();

        let previous_id = match dir.read_scene(file_path) {
            Ok(current) => Some(current.id),
            Err(StoreError::CorruptRecord { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        if previous_id.as_deref() != Some(scene.id.as_str()) {
            let entries = dir.load_entries(&manifest);
            if let Some(existing) = conflict_with(&entries, &scene.id, Some(file_path)) {
                return Err(AdminError::Conflict(format!(
                    "scene id '{}' is already used by '{existing}'",
                    scene.id
                )));
            }
        }

        dir.write_scene(file_path, &scene)?;
        tracing::info!(character = %character, file_path = %file_path, "updated scene");
        self.publish(StoryEvent::SceneUpdated {
            character: character.to_owned(),
            file_path: file_path.to_owned(),
        });
        Ok(SceneEntry::new(file_path, scene))
    }

    /// Delete a scene file and unlist it from the manifest.
    ///
    /// The manifest is read before the file is touched, so an unreadable
    /// manifest leaves the scene in place.
    pub fn delete_scene(&self, character: &str, file_path: &str) -> Result<String> {
        let dir = self.stories.character(character)?;
        check_scene_path(&dir, file_path)?;
        let manifest = if dir.has_manifest() {
            Some(dir.read_manifest()?)
        } else {
            None
        };

        dir.remove_scene(file_path)?;
        if let Some(mut manifest) = manifest {
            manifest.scenes.retain(|p| p != file_path);
            dir.write_manifest(&manifest)?;
        }
        tracing::info!(character = %character, file_path = %file_path, "deleted scene");
        self.publish(StoryEvent::SceneDeleted {
            character: character.to_owned(),
            file_path: file_path.to_owned(),
        });
        Ok(file_path.to_owned())
    }

    // -- normalization ------------------------------------------------------

    /// Move every reachable scene to its canonical path and rewrite the
    /// manifest list in place.
    ///
    /// Unreadable scenes are skipped. A rename that fails is logged and the
    /// scene stays where it was; the rest of the batch continues.
    pub fn normalize_names(&self, character: &str) -> Result<NormalizeReport> {
        let (dir, mut manifest) = self.open(character)?;
        let start = manifest
            .start_scene()
            .ok_or_else(|| AdminError::Validation("no startSceneId set".into()))?
            .to_owned();

        let entries = dir.load_entries(&manifest);
        let index = SceneIndex::from_entries(&entries);
        let origins = resolve_origins(&start, &index);
        let orphans = unreached(&entries, &origins).len();
        if orphans > 0 {
            tracing::info!(character = %character, orphans, "scenes unreachable from start");
        }

        let plan = plan_renames(&manifest.scenes, &index, &origins);
        let mut done = RenamePlan::default();
        for rename in plan.renames {
            let Some(entry) = entries.iter().find(|e| e.file_path == rename.from) else {
                continue;
            };
            match dir.move_scene(&rename.from, &rename.to, &entry.scene) {
                Ok(()) => {
                    tracing::info!(
                        character = %character,
                        from = %rename.from,
                        to = %rename.to,
                        "renamed scene file"
                    );
                    done.renames.push(rename);
                }
                Err(e) => tracing::warn!(
                    character = %character,
                    from = %rename.from,
                    to = %rename.to,
                    error = %e,
                    "scene rename failed, leaving file in place"
                ),
            }
        }

        let moved: HashSet<&str> = done.renames.iter().map(|r| r.from.as_str()).collect();
        let unchanged = manifest
            .scenes
            .iter()
            .filter(|p| !moved.contains(p.as_str()))
            .cloned()
            .collect();

        done.apply_to(&mut manifest.scenes);
        dir.write_manifest(&manifest)?;

        tracing::info!(
            character = %character,
            renamed = done.renames.len(),
            "normalized scene names"
        );
        self.publish(StoryEvent::NamesNormalized {
            character: character.to_owned(),
            renamed: done.renames.len(),
        });
        Ok(NormalizeReport {
            renamed: done.renames,
            unchanged,
        })
    }

    // -- derived views ------------------------------------------------------

    /// Tree layout of the story, with the subtrees under `collapsed` hidden.
    pub fn layout(&self, character: &str, collapsed: &[String]) -> Result<TreeLayout> {
        let (dir, manifest) = self.open(character)?;
        let entries = dir.load_entries(&manifest);
        let layout = compute_layout(&entries, &manifest.start_scene_id, &self.layout);
        if collapsed.is_empty() {
            return Ok(layout);
        }
        Ok(collapse(&layout, collapsed.iter().map(String::as_str)))
    }

    /// Scenes matching `query`, in manifest order.
    pub fn search(&self, character: &str, query: &str) -> Result<Vec<SceneEntry>> {
        let (dir, manifest) = self.open(character)?;
        let entries = dir.load_entries(&manifest);
        Ok(search_scenes(&entries, query).into_iter().cloned().collect())
    }

    /// The next free id after `parent_id`, if it ends in a number.
    pub fn suggest_id(&self, character: &str, parent_id: &str) -> Result<Option<String>> {
        let (dir, manifest) = self.open(character)?;
        let entries = dir.load_entries(&manifest);
        let taken: HashSet<&str> = entries.iter().map(|e| e.scene.id.as_str()).collect();
        Ok(suggest_next_id(parent_id, |id| taken.contains(id)))
    }
}
