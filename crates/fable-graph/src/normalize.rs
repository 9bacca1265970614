//! Canonical scene file paths and rename planning.
//!
//! A scene's canonical path depends only on its origin set:
//!
//! | origins        | canonical path                   |
//! |----------------|----------------------------------|
//! | none           | `{sceneId}.json`                 |
//! | exactly one    | `{decisionId}_{sceneId}.json`    |
//! | two or more    | `{sceneId}.json`                 |
//!
//! where `decisionId` is the single origin tag with its `_c{n}` suffix
//! removed. [`plan_renames`] diffs canonical paths against the manifest and
//! produces a [`RenamePlan`]; executing it is the caller's job.
//!
//! Because the canonical path never depends on where a file currently lives,
//! applying a plan and planning again yields no renames.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::index::SceneIndex;
use crate::reachability::{OriginMap, OriginSet};

// ---------------------------------------------------------------------------
// Canonical paths
// ---------------------------------------------------------------------------

/// The canonical relative path for `scene_id` given its origins.
pub fn canonical_path(scene_id: &str, origins: &OriginSet) -> String {
    match (origins.len(), origins.iter().next()) {
        (1, Some(origin)) => format!("{}_{scene_id}.json", decision_id(origin)),
        _ => format!("{scene_id}.json"),
    }
}

/// Strip a trailing `_c{digits}` from an origin tag.
///
/// Tags without that suffix are returned unchanged.
pub fn decision_id(origin: &str) -> &str {
    match origin.rfind("_c") {
        Some(pos) => {
            let digits = &origin[pos + 2..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                &origin[..pos]
            } else {
                origin
            }
        }
        None => origin,
    }
}

// ---------------------------------------------------------------------------
// RenamePlan
// ---------------------------------------------------------------------------

/// One file move, as relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl Rename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Renames to perform, and manifest paths left where they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePlan {
    /// Moves in scene discovery order.
    pub renames: Vec<Rename>,
    /// Manifest paths not being moved, in manifest order.
    pub unchanged: Vec<String>,
}

impl RenamePlan {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// The target for `from`, if it is being moved.
    pub fn target_of(&self, from: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|r| r.from == from)
            .map(|r| r.to.as_str())
    }

    /// Substitute renamed paths in a manifest scene list, keeping its order.
    pub fn apply_to(&self, scenes: &mut [String]) {
        for path in scenes.iter_mut() {
            if let Some(to) = self.target_of(path) {
                *path = to.to_owned();
            }
        }
    }
}

/// Diff canonical paths against the manifest.
///
/// Scenes are skipped (left unchanged) when:
/// - they were not reached from the start scene,
/// - their id is declared by more than one file,
/// - their canonical path is already listed in the manifest or claimed by an
///   earlier rename in this plan.
pub fn plan_renames(manifest_scenes: &[String], index: &SceneIndex<'_>, origins: &OriginMap) -> RenamePlan {
    let listed: HashSet<&str> = manifest_scenes.iter().map(String::as_str).collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut renames = Vec::new();

    for (scene_id, scene_origins) in origins.iter() {
        let Some(current) = index.file_path(scene_id) else {
            continue;
        };
        let target = canonical_path(scene_id, scene_origins);
        if current == target {
            continue;
        }
        if index.is_duplicate(scene_id) {
            tracing::warn!(scene_id = %scene_id, "not renaming scene with duplicated id");
            continue;
        }
        if listed.contains(target.as_str()) || claimed.contains(&target) {
            tracing::warn!(
                scene_id = %scene_id,
                from = %current,
                to = %target,
                "canonical path already taken, leaving scene in place"
            );
            continue;
        }
        claimed.insert(target.clone());
        renames.push(Rename::new(current, target));
    }

    let moving: HashSet<&str> = renames.iter().map(|r| r.from.as_str()).collect();
    let unchanged = manifest_scenes
        .iter()
        .filter(|p| !moving.contains(p.as_str()))
        .cloned()
        .collect();

    RenamePlan { renames, unchanged }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
