//! Breadth-first origin tagging from the start scene.
//!
//! Every scene reachable from the start scene receives an [`OriginSet`]: the
//! choice branches through which it can be reached. Tags have the form
//! `"{parentId}_c{n}"` for the n-th choice (1-indexed) of `parentId`.
//!
//! - The start scene has no origins.
//! - A linear edge (`next`) passes the current scene's origins to its
//!   successor unchanged.
//! - A choice edge adds exactly one new tag to its target.
//!
//! # Queued versus processed
//!
//! A scene is enqueued once, on first discovery, and processed once. Its
//! origin set may still grow after it was enqueued when another path reaches
//! it; sets only ever gain tags. This is what lets a diamond-shaped graph
//! report a scene reachable from two branches. Marking scenes as visited on
//! enqueue and ignoring later arrivals would silently lose that.
//!
//! Targets that are not in the [`SceneIndex`] are skipped. Cycles terminate
//! because nothing is enqueued twice.

use std::collections::{BTreeSet, HashMap, VecDeque};

use fable_store::model::SceneEntry;

use crate::index::SceneIndex;

/// Branch tags reaching one scene. Empty means "linear spine only".
pub type OriginSet = BTreeSet<String>;

// ---------------------------------------------------------------------------
// OriginMap
// ---------------------------------------------------------------------------

/// Origin sets keyed by scene id, iterable in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginMap {
    order: Vec<String>,
    origins: HashMap<String, OriginSet>,
}

impl OriginMap {
    pub fn get(&self, id: &str) -> Option<&OriginSet> {
        self.origins.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.origins.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Scene ids in the order they were first discovered.
    pub fn discovery_order(&self) -> &[String] {
        &self.order
    }

    /// `(id, origins)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OriginSet)> {
        self.order
            .iter()
            .map(move |id| (id.as_str(), &self.origins[id.as_str()]))
    }

    /// Insert an empty entry for `id` if absent. Returns `true` on first insert.
    fn enqueue_marker(&mut self, id: &str) -> bool {
        if self.origins.contains_key(id) {
            return false;
        }
        self.order.push(id.to_owned());
        self.origins.insert(id.to_owned(), OriginSet::new());
        true
    }

    fn origins_mut(&mut self, id: &str) -> &mut OriginSet {
        self.origins
            .get_mut(id)
            .expect("origin entry is created before it is extended")
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Compute origin sets for every scene reachable from `start`.
///
/// Returns an empty map if `start` is not in `index`.
pub fn resolve_origins(start: &str, index: &SceneIndex<'_>) -> OriginMap {
    let mut map = OriginMap::default();
    if !index.contains(start) {
        return map;
    }

    let mut queue = VecDeque::new();
    map.enqueue_marker(start);
    queue.push_back(start.to_owned());

    while let Some(current_id) = queue.pop_front() {
        let Some(scene) = index.scene(&current_id) else {
            continue;
        };
        let current_origins = map.origins_mut(&current_id).clone();

        if let Some(next_id) = scene.next_id() {
            if index.contains(next_id) {
                let first_seen = map.enqueue_marker(next_id);
                map.origins_mut(next_id)
                    .extend(current_origins.iter().cloned());
                if first_seen {
                    queue.push_back(next_id.to_owned());
                }
            }
        }

        for (i, choice) in scene.choices().iter().enumerate() {
            let Some(target) = choice.target() else {
                continue;
            };
            if !index.contains(target) {
                continue;
            }
            let first_seen = map.enqueue_marker(target);
            map.origins_mut(target)
                .insert(format!("{current_id}_c{}", i + 1));
            if first_seen {
                queue.push_back(target.to_owned());
            }
        }
    }

    map
}

/// Entries whose scene was never reached from the start scene.
pub fn unreached<'a>(entries: &'a [SceneEntry], origins: &OriginMap) -> Vec<&'a SceneEntry> {
    entries
        .iter()
        .filter(|e| !origins.contains(&e.scene.id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
