//! Case-insensitive text search over scenes.

use fable_store::model::SceneEntry;

/// Entries whose id, title, text or any choice text contains `query`.
///
/// Matching ignores case and surrounding whitespace in `query`. An empty
/// query matches nothing. Results keep the order of `entries`.
pub fn search_scenes<'a>(entries: &'a [SceneEntry], query: &str) -> Vec<&'a SceneEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let hit = |s: &str| s.to_lowercase().contains(&needle);

    entries
        .iter()
        .filter(|e| {
            let scene = &e.scene;
            hit(&scene.id)
                || scene.title().is_some_and(hit)
                || hit(&scene.text)
                || scene.choices().iter().any(|c| hit(&c.text))
        })
        .collect()
}
