//! Persisted story records.
//!
//! The JSON shapes mirror the files authors edit by hand: camelCase keys,
//! optional fields omitted rather than written as `null`. A [`Scene`] keeps any
//! keys it does not model in [`Scene::extra`] so that reading and rewriting a
//! file never drops author data. `speaker` and `portrait` distinguish an
//! omitted key (inherit the manifest default) from an explicit `null` (none).
//!
//! [`SceneType`] is always derived from content via [`Scene::scene_type`] and
//! never read from input.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Keys that describe a scene entry rather than the scene itself. They are
/// derived on read and never written into a scene file.
pub const DERIVED_KEYS: [&str; 2] = ["sceneType", "filePath"];

/// Deserialize a present key into `Some`, keeping an explicit `null` as
/// `Some(None)`. Pair with `#[serde(default)]` so an absent key stays `None`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Asset alias tables: alias name to asset URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<BTreeMap<String, String>>,
}

/// Per-character index stored as `index.json`.
///
/// `scenes` holds paths relative to the character directory in insertion
/// order, not traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    /// Empty string when no start scene has been chosen yet.
    #[serde(default)]
    pub start_scene_id: String,
    /// Fallback speaker for scenes that omit one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
    #[serde(default)]
    pub scenes: Vec<String>,
}

impl Manifest {
    /// An empty manifest for a freshly created character.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_scene_id: String::new(),
            default_speaker: None,
            assets: None,
            scenes: Vec::new(),
        }
    }

    /// The start scene id, or `None` when unset.
    pub fn start_scene(&self) -> Option<&str> {
        non_empty(&self.start_scene_id)
    }

    /// Whether `file_path` is listed.
    pub fn lists(&self, file_path: &str) -> bool {
        self.scenes.iter().any(|p| p == file_path)
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// One labeled branch out of a choice scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub next_scene_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Choice {
    pub fn new(text: impl Into<String>, next_scene_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            next_scene_id: next_scene_id.into(),
            condition: None,
        }
    }

    /// The target scene id, or `None` when the choice is not linked yet.
    pub fn target(&self) -> Option<&str> {
        non_empty(&self.next_scene_id)
    }
}

/// A scene record in its raw, persisted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub background: String,
    /// `None` inherits the manifest's default speaker; `Some(None)` is an
    /// explicit `null` meaning no speaker.
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub speaker: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub portrait: Option<Option<String>>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    /// Keys this type does not model (`title`, editor metadata, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Derived classification of a scene. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneType {
    /// Advances to a single successor via `next`.
    Linear,
    /// Branches through a non-empty `choices` list.
    Choice,
    /// Ends the story path.
    Terminal,
}

impl Scene {
    /// A terminal scene with the given id and text and no other fields.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            background: String::new(),
            speaker: None,
            portrait: None,
            text: text.into(),
            next: None,
            choices: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Builder: set the linear successor.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Builder: set the choice list.
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = Some(choices);
        self
    }

    /// The linear successor id, or `None` when absent or empty.
    pub fn next_id(&self) -> Option<&str> {
        self.next.as_deref().and_then(non_empty)
    }

    /// The choice list, empty when absent.
    pub fn choices(&self) -> &[Choice] {
        self.choices.as_deref().unwrap_or(&[])
    }

    /// Classify the scene from its content.
    ///
    /// A non-empty choice list wins over `next`; a scene with neither is
    /// terminal.
    pub fn scene_type(&self) -> SceneType {
        if !self.choices().is_empty() {
            SceneType::Choice
        } else if self.next_id().is_some() {
            SceneType::Linear
        } else {
            SceneType::Terminal
        }
    }

    /// Drop [`DERIVED_KEYS`] that a client echoed back from a scene entry.
    pub fn strip_derived(&mut self) {
        for key in DERIVED_KEYS {
            self.extra.remove(key);
        }
    }

    /// The optional `title` key some authors add for search.
    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// SceneEntry
// ---------------------------------------------------------------------------

/// A scene together with the manifest path it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEntry {
    pub file_path: String,
    pub scene: Scene,
    pub scene_type: SceneType,
}

impl SceneEntry {
    /// Pair a scene with its path, classifying it from content.
    pub fn new(file_path: impl Into<String>, scene: Scene) -> Self {
        let scene_type = scene.scene_type();
        Self {
            file_path: file_path.into(),
            scene,
            scene_type,
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
