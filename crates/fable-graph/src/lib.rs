//! Fable Graph -- pure derivations over a character's scene graph.
//!
//! Everything in this crate is computed from a snapshot of
//! [`SceneEntry`](fable_store::model::SceneEntry) records and a start scene id.
//! Nothing is cached and nothing touches the filesystem; callers recompute on
//! every request.
//!
//! # Modules
//!
//! - [`index`]: id-to-scene lookup with duplicate-id detection.
//! - [`reachability`]: breadth-first origin tagging from the start scene.
//! - [`normalize`]: canonical file paths and the rename plan derived from origins.
//! - [`layout`]: column/row tree layout with Bézier edges for the node editor.
//! - [`collapse`]: hiding the descendants of collapsed layout nodes.
//! - [`search`]: text search over scenes.
//! - [`naming`]: next-id suggestions for newly authored scenes.
//!
//! # Quick Start
//!
//! ```
//! use fable_graph::prelude::*;
//! use fable_store::model::{Choice, Scene, SceneEntry};
//!
//! let entries = vec![
//!     SceneEntry::new("s1.json", Scene::new("s1", "").with_next("s2")),
//!     SceneEntry::new("s2.json", Scene::new("s2", "").with_choices(vec![Choice::new("go", "s3")])),
//!     SceneEntry::new("s3.json", Scene::new("s3", "")),
//! ];
//! let index = SceneIndex::from_entries(&entries);
//! let origins = resolve_origins("s1", &index);
//!
//! assert!(origins.get("s2").unwrap().is_empty());
//! assert!(origins.get("s3").unwrap().contains("s2_c1"));
//!
//! let scenes: Vec<String> = entries.iter().map(|e| e.file_path.clone()).collect();
//! let plan = plan_renames(&scenes, &index, &origins);
//! assert_eq!(plan.renames, vec![Rename::new("s3.json", "s2_s3.json")]);
//! ```

#![deny(unsafe_code)]

pub mod collapse;
pub mod index;
pub mod layout;
pub mod naming;
pub mod normalize;
pub mod reachability;
pub mod search;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::collapse::{collapse, hidden_nodes};
    pub use crate::index::SceneIndex;
    pub use crate::layout::{
        compute_layout, BezierCurve, EdgeKind, LayoutConfig, Point, TreeEdge, TreeLayout,
        TreeNode,
    };
    pub use crate::naming::suggest_next_id;
    pub use crate::normalize::{canonical_path, plan_renames, Rename, RenamePlan};
    pub use crate::reachability::{resolve_origins, OriginMap, OriginSet};
    pub use crate::search::search_scenes;
}
