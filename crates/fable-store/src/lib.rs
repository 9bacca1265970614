//! Fable Store -- path-addressed JSON scene records for branching stories.
//!
//! Every character owns one directory under the stories root. The directory
//! holds an `index.json` [`Manifest`](model::Manifest) listing scene file paths
//! in insertion order, plus one JSON file per [`Scene`](model::Scene). The
//! on-disk tree is the single source of truth; nothing in this crate caches.
//!
//! # Modules
//!
//! - [`model`]: Manifest, scene and choice records, derived [`SceneType`](model::SceneType).
//! - [`path`]: Path containment and identifier validation.
//! - [`io`]: Atomic JSON writes and typed JSON reads.
//! - [`character`]: Stories root and per-character directory operations.
//!
//! # Quick Start
//!
//! ```no_run
//! use fable_store::prelude::*;
//!
//! let stories = Stories::new("public/stories");
//! let warrior = stories.create_character("warrior").unwrap();
//!
//! let scene = Scene::new("w_001", "Dawn breaks over the camp.");
//! warrior.write_scene("w_001.json", &scene).unwrap();
//!
//! let read_back = warrior.read_scene("w_001.json").unwrap();
//! assert_eq!(read_back.scene_type(), SceneType::Terminal);
//! ```

#![deny(unsafe_code)]

pub mod character;
pub mod io;
pub mod model;
pub mod path;

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by scene store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest or scene file exists but does not hold valid JSON for its record type.
    #[error("corrupt record at {path}: {source}")]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A relative path resolved outside the directory it was scoped to.
    #[error("path '{path}' escapes its root directory")]
    PathTraversal { path: String },

    /// The addressed character, manifest or scene does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The addressed character or record already exists.
    #[error("{what} already exists")]
    AlreadyExists { what: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::character::{CharacterDir, CharacterSummary, Stories, MANIFEST_FILE};
    pub use crate::model::{Assets, Choice, Manifest, Scene, SceneEntry, SceneType};
    pub use crate::path::{is_valid_scene_id, safe_resolve};
    pub use crate::StoreError;
}
