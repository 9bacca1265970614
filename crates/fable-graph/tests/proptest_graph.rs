//! Property tests for the graph derivations.
//!
//! Random story graphs (mixtures of linear, choice and terminal scenes with
//! arbitrary and dangling targets) are fed through origin resolution, rename
//! planning and layout, and structural invariants are checked on the output.

use std::collections::HashSet;

use fable_graph::prelude::*;
use fable_store::model::{Choice, Scene, SceneEntry};
use proptest::prelude::*;

/// Outgoing links of one generated scene, as indices into the id pool.
/// Indices past the number of scenes become dangling targets.
#[derive(Debug, Clone)]
enum Shape {
    Terminal,
    Linear(usize),
    Choices(Vec<usize>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Terminal),
        (0..24usize).prop_map(Shape::Linear),
        prop::collection::vec(0..24usize, 1..4).prop_map(Shape::Choices),
    ]
}

fn build(shapes: &[Shape]) -> Vec<SceneEntry> {
    let id = |i: usize| format!("n{i}");
    shapes
        .iter()
        .enumerate()
        .map(|(i, shape)| {
            let scene = match shape {
                Shape::Terminal => Scene::new(id(i), ""),
                Shape::Linear(t) => Scene::new(id(i), "").with_next(id(*t)),
                Shape::Choices(ts) => Scene::new(id(i), "").with_choices(
                    ts.iter()
                        .enumerate()
                        .map(|(k, t)| Choice::new(format!("opt{k}"), id(*t)))
                        .collect(),
                ),
            };
            SceneEntry::new(format!("{}.json", id(i)), scene)
        })
        .collect()
}

fn paths(entries: &[SceneEntry]) -> Vec<String> {
    entries.iter().map(|e| e.file_path.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn origins_cover_exactly_the_reachable_scenes(shapes in prop::collection::vec(shape_strategy(), 1..16)) {
        let entries = build(&shapes);
        let index = SceneIndex::from_entries(&entries);
        let origins = resolve_origins("n0", &index);

        // Start has no origins and every tagged scene exists.
        prop_assert!(origins.get("n0").is_some_and(|o| o.is_empty()));
        for (id, _) in origins.iter() {
            prop_assert!(index.contains(id));
        }

        // No id is discovered twice.
        let unique: HashSet<_> = origins.discovery_order().iter().collect();
        prop_assert_eq!(unique.len(), origins.len());

        // Every tag names a choice scene and a valid 1-based choice index.
        for (_, set) in origins.iter() {
            for tag in set {
                let parent = tag.rsplit_once("_c").map(|(p, _)| p).unwrap();
                let n: usize = tag.rsplit_once("_c").unwrap().1.parse().unwrap();
                let scene = index.scene(parent).unwrap();
                prop_assert!(n >= 1 && n <= scene.choices().len());
            }
        }
    }

    #[test]
    fn origin_sets_do_not_depend_on_manifest_order(shapes in prop::collection::vec(shape_strategy(), 1..16)) {
        let entries = build(&shapes);
        let mut reversed = entries.clone();
        reversed.reverse();

        let forward_index = SceneIndex::from_entries(&entries);
        let backward_index = SceneIndex::from_entries(&reversed);
        let forward = resolve_origins("n0", &forward_index);
        let backward = resolve_origins("n0", &backward_index);

        prop_assert_eq!(forward.len(), backward.len());
        for (id, set) in forward.iter() {
            prop_assert_eq!(Some(set), backward.get(id));
        }
    }

    #[test]
    fn layout_places_reachable_scenes_and_orphans_the_rest(shapes in prop::collection::vec(shape_strategy(), 1..16)) {
        let entries = build(&shapes);
        let index = SceneIndex::from_entries(&entries);
        let origins = resolve_origins("n0", &index);
        let layout = compute_layout(&entries, "n0", &LayoutConfig::default());

        prop_assert_eq!(layout.nodes.len() + layout.orphans.len(), entries.len());

        // Layout follows only `next` on scenes carrying both, so its node set
        // is a subset of the scenes that have origins.
        for node in &layout.nodes {
            prop_assert!(origins.contains(&node.id));
        }

        let placed: HashSet<_> = layout.nodes.iter().map(|n| (n.column, n.row)).collect();
        prop_assert_eq!(placed.len(), layout.nodes.len());

        for edge in &layout.edges {
            prop_assert!(layout.node(&edge.from).is_some());
            prop_assert!(layout.node(&edge.to).is_some());
            prop_assert!(edge.from_anchor > 0.0 && edge.from_anchor < 1.0);
        }
    }

    #[test]
    fn applying_a_plan_makes_normalization_idempotent(shapes in prop::collection::vec(shape_strategy(), 1..16)) {
        let mut entries = build(&shapes);
        let mut scenes = paths(&entries);

        let plan = {
            let index = SceneIndex::from_entries(&entries);
            plan_renames(&scenes, &index, &resolve_origins("n0", &index))
        };

        let targets: HashSet<_> = plan.renames.iter().map(|r| r.to.as_str()).collect();
        prop_assert_eq!(targets.len(), plan.renames.len());
        prop_assert_eq!(plan.renames.len() + plan.unchanged.len(), scenes.len());

        for entry in &mut entries {
            if let Some(to) = plan.target_of(&entry.file_path) {
                entry.file_path = to.to_owned();
            }
        }
        plan.apply_to(&mut scenes);

        let index = SceneIndex::from_entries(&entries);
        let second = plan_renames(&scenes, &index, &resolve_origins("n0", &index));
        prop_assert!(second.is_empty(), "second pass renamed {:?}", second.renames);
    }
}
