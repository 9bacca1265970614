//! Gateway tests against a temporary stories root: validation, manifest
//! consistency, create-from-linear linking and name normalization on disk.

use std::fs;
use std::sync::Arc;

use fable_admin::prelude::*;
use fable_graph::layout::LayoutConfig;
use fable_graph::normalize::Rename;
use fable_store::model::{Choice, Scene};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    _dir: TempDir,
    gateway: StoryGateway,
    events: Arc<ClientRegistry>,
}

fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let events = Arc::new(ClientRegistry::new());
    let gateway = StoryGateway::new(dir.path(), LayoutConfig::default(), Arc::clone(&events));
    gateway.create_character("warrior").unwrap();
    Fixture {
        _dir: dir,
        gateway,
        events,
    }
}

fn create(fx: &Fixture, scene: Scene) {
    fx.gateway
        .create_scene("warrior", NewScene::new(scene))
        .unwrap();
}

/// s1 -> s2 -> (choice) s3, start s1.
fn example_story(fx: &Fixture) {
    create(fx, Scene::new("s1", "").with_next("s2"));
    create(fx, Scene::new("s2", "").with_choices(vec![Choice::new("go", "s3")]));
    create(fx, Scene::new("s3", ""));
    fx.gateway
        .update_manifest(
            "warrior",
            ManifestPatch {
                start_scene_id: Some("s1".into()),
                ..Default::default()
            },
        )
        .unwrap();
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

#[test]
fn created_character_is_listed_and_duplicate_conflicts() {
    let fx = setup();
    let list = fx.gateway.list_characters().unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0].has_manifest);

    let err = fx.gateway.create_character("warrior").unwrap_err();
    assert_eq!(err.status(), 409);
}

#[test]
fn character_id_with_separator_is_rejected() {
    let fx = setup();
    assert_eq!(fx.gateway.create_character("../escape").unwrap_err().status(), 403);
    assert_eq!(fx.gateway.get_story("nobody").unwrap_err().status(), 404);
}

// ---------------------------------------------------------------------------
// Scene creation
// ---------------------------------------------------------------------------

#[test]
fn create_appends_to_manifest_in_order() {
    let fx = setup();
    example_story(&fx);

    let story = fx.gateway.get_story("warrior").unwrap();
    assert_eq!(story.manifest.scenes, ["s1.json", "s2.json", "s3.json"]);
    assert_eq!(story.scenes.len(), 3);
}

#[test]
fn create_with_prefix_writes_nested_file() {
    let fx = setup();
    let mut request = NewScene::new(Scene::new("w_010", ""));
    request.prefix = Some("branch/".into());

    let entry = fx.gateway.create_scene("warrior", request).unwrap();
    assert_eq!(entry.file_path, "branch/w_010.json");
    assert!(fx.gateway.stories_root().join("warrior/branch/w_010.json").is_file());
}

#[test]
fn invalid_requests_leave_no_trace() {
    let fx = setup();

    let err = fx
        .gateway
        .create_scene("warrior", NewScene::new(Scene::new("no spaces", "")))
        .unwrap_err();
    assert_eq!(err.status(), 400);

    let unlinked = Scene::new("c1", "").with_choices(vec![Choice::new("wait", "")]);
    let err = fx.gateway.create_scene("warrior", NewScene::new(unlinked)).unwrap_err();
    assert_eq!(err.status(), 400);

    let mut escaping = NewScene::new(Scene::new("x", ""));
    escaping.prefix = Some("../../".into());
    assert_eq!(fx.gateway.create_scene("warrior", escaping).unwrap_err().status(), 403);

    let story = fx.gateway.get_story("warrior").unwrap();
    assert!(story.manifest.scenes.is_empty());
}

#[test]
fn duplicate_scene_id_conflicts() {
    let fx = setup();
    create(&fx, Scene::new("s1", ""));

    let mut elsewhere = NewScene::new(Scene::new("s1", ""));
    elsewhere.prefix = Some("other_".into());
    assert_eq!(fx.gateway.create_scene("warrior", elsewhere).unwrap_err().status(), 409);
}

#[test]
fn scene_path_cannot_address_the_manifest() {
    let fx = setup();
    let err = fx
        .gateway
        .update_scene("warrior", "index.json", Scene::new("index", ""))
        .unwrap_err();
    assert_eq!(err.status(), 400);
    assert!(fx.gateway.get_story("warrior").is_ok());
}

#[test]
fn create_from_linear_links_parent_next() {
    let fx = setup();
    create(&fx, Scene::new("w_001", "Dawn."));
    let suggested = fx.gateway.suggest_id("warrior", "w_001").unwrap();
    assert_eq!(suggested.as_deref(), Some("w_002"));

    let mut request = NewScene::new(Scene::new("w_002", "Noon."));
    request.link_after = Some("w_001.json".into());
    fx.gateway.create_scene("warrior", request).unwrap();

    let parent = fx.gateway.read_scene("warrior", "w_001.json").unwrap();
    assert_eq!(parent.scene.next.as_deref(), Some("w_002"));
}

#[test]
fn create_from_missing_parent_is_not_found_and_writes_nothing() {
    let fx = setup();
    let mut request = NewScene::new(Scene::new("w_002", ""));
    request.link_after = Some("ghost.json".into());

    assert_eq!(fx.gateway.create_scene("warrior", request).unwrap_err().status(), 404);
    assert!(!fx.gateway.stories_root().join("warrior/w_002.json").exists());
}

// ---------------------------------------------------------------------------
// Update, read, delete
// ---------------------------------------------------------------------------

#[test]
fn update_changing_id_requires_it_to_be_free() {
    let fx = setup();
    create(&fx, Scene::new("a", ""));
    create(&fx, Scene::new("b", ""));

    let err = fx.gateway.update_scene("warrior", "b.json", Scene::new("a", "")).unwrap_err();
    assert_eq!(err.status(), 409);

    let entry = fx.gateway.update_scene("warrior", "b.json", Scene::new("c", "")).unwrap();
    assert_eq!(entry.scene.id, "c");
}

#[test]
fn derived_entry_keys_are_not_written_to_scene_files() {
    let fx = setup();
    let body = serde_json::json!({
        "id": "a",
        "text": "",
        "sceneType": "choice",
        "filePath": "zzz.json",
        "title": "kept"
    });
    let request: NewScene = serde_json::from_value(body).unwrap();
    let entry = fx.gateway.create_scene("warrior", request).unwrap();
    assert_eq!(entry.file_path, "a.json");

    let path = fx.gateway.stories_root().join("warrior/a.json");
    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(on_disk.get("sceneType").is_none());
    assert!(on_disk.get("filePath").is_none());
    assert_eq!(on_disk["title"], "kept");

    // An editor putting back the entry it was given.
    let echoed: Scene = serde_json::from_value(serde_json::json!({
        "id": "a",
        "text": "edited",
        "sceneType": "terminal",
        "filePath": "a.json"
    }))
    .unwrap();
    fx.gateway.update_scene("warrior", "a.json", echoed).unwrap();
    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(on_disk.get("sceneType").is_none());
    assert!(on_disk.get("filePath").is_none());
    assert_eq!(on_disk["text"], "edited");
}

#[test]
fn update_missing_scene_is_not_found() {
    let fx = setup();
    let err = fx.gateway.update_scene("warrior", "nope.json", Scene::new("nope", "")).unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn corrupt_scene_fails_direct_read_but_can_be_overwritten() {
    let fx = setup();
    create(&fx, Scene::new("a", "fine"));
    let path = fx.gateway.stories_root().join("warrior/a.json");
    fs::write(&path, "{ not json").unwrap();

    assert_eq!(fx.gateway.read_scene("warrior", "a.json").unwrap_err().status(), 500);
    assert!(fx.gateway.get_story("warrior").unwrap().scenes.is_empty());

    fx.gateway.update_scene("warrior", "a.json", Scene::new("a", "fixed")).unwrap();
    assert_eq!(fx.gateway.read_scene("warrior", "a.json").unwrap().scene.text, "fixed");
}

#[test]
fn delete_unlists_scene() {
    let fx = setup();
    example_story(&fx);

    assert_eq!(fx.gateway.delete_scene("warrior", "s2.json").unwrap(), "s2.json");
    let story = fx.gateway.get_story("warrior").unwrap();
    assert_eq!(story.manifest.scenes, ["s1.json", "s3.json"]);
    assert_eq!(fx.gateway.delete_scene("warrior", "s2.json").unwrap_err().status(), 404);
}

#[test]
fn delete_with_corrupt_manifest_keeps_the_file() {
    let fx = setup();
    example_story(&fx);
    let root = fx.gateway.stories_root().join("warrior");
    fs::write(root.join("index.json"), "{ broken").unwrap();

    assert_eq!(fx.gateway.delete_scene("warrior", "s2.json").unwrap_err().status(), 500);
    assert!(root.join("s2.json").is_file());
}

#[test]
fn traversal_paths_are_denied() {
    let fx = setup();
    for path in ["../index.json", "a/../../x.json", "/etc/passwd"] {
        assert_eq!(fx.gateway.read_scene("warrior", path).unwrap_err().status(), 403, "{path}");
        assert_eq!(fx.gateway.delete_scene("warrior", path).unwrap_err().status(), 403, "{path}");
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[test]
fn manifest_patch_leaves_absent_fields_alone() {
    let fx = setup();
    example_story(&fx);

    let manifest = fx
        .gateway
        .update_manifest(
            "warrior",
            ManifestPatch {
                default_speaker: Some(Some("Narrator".into())),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(manifest.default_speaker.as_deref(), Some("Narrator"));
    assert_eq!(manifest.start_scene_id, "s1");
    assert_eq!(manifest.scenes.len(), 3);
}

#[test]
fn manifest_patch_with_null_speaker_clears_it() {
    let fx = setup();
    let set = ManifestPatch {
        default_speaker: Some(Some("Narrator".into())),
        ..Default::default()
    };
    fx.gateway.update_manifest("warrior", set).unwrap();

    let clear = ManifestPatch {
        default_speaker: Some(None),
        ..Default::default()
    };
    let manifest = fx.gateway.update_manifest("warrior", clear).unwrap();
    assert_eq!(manifest.default_speaker, None);
    assert_eq!(fx.gateway.get_story("warrior").unwrap().manifest.default_speaker, None);
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn normalize_requires_start_scene() {
    let fx = setup();
    create(&fx, Scene::new("s1", ""));
    assert_eq!(fx.gateway.normalize_names("warrior").unwrap_err().status(), 400);
}

#[test]
fn normalize_example_story_moves_one_file() {
    let fx = setup();
    example_story(&fx);

    let report = fx.gateway.normalize_names("warrior").unwrap();
    assert_eq!(report.renamed, vec![Rename::new("s3.json", "s2_s3.json")]);
    assert_eq!(report.unchanged, ["s1.json", "s2.json"]);

    let root = fx.gateway.stories_root().join("warrior");
    assert!(root.join("s2_s3.json").is_file());
    assert!(!root.join("s3.json").exists());

    let story = fx.gateway.get_story("warrior").unwrap();
    assert_eq!(story.manifest.scenes, ["s1.json", "s2.json", "s2_s3.json"]);

    let again = fx.gateway.normalize_names("warrior").unwrap();
    assert!(again.renamed.is_empty());
    assert_eq!(again.unchanged, story.manifest.scenes);
}

#[test]
fn normalize_keeps_null_speaker_on_moved_scene() {
    let fx = setup();
    example_story(&fx);
    let root = fx.gateway.stories_root().join("warrior");
    fs::write(
        root.join("s3.json"),
        r#"{ "id": "s3", "background": "b", "speaker": null, "portrait": null, "text": "narration" }"#,
    )
    .unwrap();

    fx.gateway.normalize_names("warrior").unwrap();

    let moved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("s2_s3.json")).unwrap()).unwrap();
    assert_eq!(moved.get("speaker"), Some(&serde_json::Value::Null));
    assert_eq!(moved.get("portrait"), Some(&serde_json::Value::Null));
}

#[test]
fn normalize_does_not_overwrite_unlisted_file_at_target() {
    let fx = setup();
    example_story(&fx);
    let root = fx.gateway.stories_root().join("warrior");
    fs::write(root.join("s2_s3.json"), r#"{ "id": "stray", "text": "keep me" }"#).unwrap();

    let report = fx.gateway.normalize_names("warrior").unwrap();
    assert!(report.renamed.is_empty());
    assert_eq!(report.unchanged, ["s1.json", "s2.json", "s3.json"]);

    assert!(root.join("s3.json").is_file());
    assert!(fs::read_to_string(root.join("s2_s3.json")).unwrap().contains("keep me"));
    let story = fx.gateway.get_story("warrior").unwrap();
    assert_eq!(story.manifest.scenes, ["s1.json", "s2.json", "s3.json"]);
}

#[test]
fn normalize_prunes_emptied_directories_and_skips_bad_records() {
    let fx = setup();
    create(&fx, Scene::new("s1", "").with_next("s2"));
    let mut nested = NewScene::new(Scene::new("s2", ""));
    nested.prefix = Some("old/".into());
    fx.gateway.create_scene("warrior", nested).unwrap();
    create(&fx, Scene::new("broken", ""));
    fx.gateway
        .update_manifest(
            "warrior",
            ManifestPatch {
                start_scene_id: Some("s1".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let root = fx.gateway.stories_root().join("warrior");
    fs::write(root.join("broken.json"), "garbage").unwrap();

    let report = fx.gateway.normalize_names("warrior").unwrap();
    assert_eq!(report.renamed, vec![Rename::new("old/s2.json", "s2.json")]);
    assert!(report.unchanged.contains(&"broken.json".to_owned()));
    assert!(!root.join("old").exists());
}

// ---------------------------------------------------------------------------
// Derived views and events
// ---------------------------------------------------------------------------

#[test]
fn layout_search_and_collapse() {
    let fx = setup();
    example_story(&fx);
    create(&fx, Scene::new("lost", "A forgotten scene."));

    let layout = fx.gateway.layout("warrior", &[]).unwrap();
    assert_eq!(layout.nodes.len(), 3);
    assert_eq!(layout.orphans, ["lost"]);

    let collapsed = fx.gateway.layout("warrior", &["s2".to_owned()]).unwrap();
    assert!(collapsed.node("s3").is_none());

    let hits = fx.gateway.search("warrior", "FORGOTTEN").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file_path, "lost.json");
}

#[test]
fn mutations_publish_events() {
    let fx = setup();
    let (_, mut rx) = fx.events.add();

    create(&fx, Scene::new("s1", ""));
    fx.gateway.delete_scene("warrior", "s1.json").unwrap();

    assert_eq!(
        rx.try_recv().unwrap(),
        StoryEvent::SceneCreated {
            character: "warrior".into(),
            file_path: "s1.json".into(),
        }
    );
    assert_eq!(rx.try_recv().unwrap().name(), "sceneDeleted");
    assert!(rx.try_recv().is_err());
}
