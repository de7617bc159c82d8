//! End-to-end tests for the record store, catalog loading and reference
//! validation.

mod common;

use std::fs;
use std::io::Write;

use common::{TestProject, GREETING_TAKES, SCENE_NAME};
use serde_json::json;
use takebin::catalog_store::{
    append, ensure_exists, load_catalog, read_all, replace_all, validate_references, Actor,
    Catalog, EntityKind, Generation, RecordStore, TakeDraft, ValidationError,
};
use tempfile::TempDir;

#[test]
fn test_replace_all_then_read_all_returns_same_records() {
    let dir = TempDir::new().unwrap();
    let store: RecordStore<Actor> = RecordStore::new(dir.path().join("actors.jsonl"));

    let mut actors = vec![
        Actor::new("Narrator", "narrator"),
        Actor::new("Villain", "villain"),
        Actor::new("Crowd: \"Extras\" ☂", "crowd_extras"),
    ];
    actors[1].complete = true;

    store.replace_all(&actors).unwrap();
    assert_eq!(store.read_all().unwrap(), actors);

    store.replace_all(&actors[..1]).unwrap();
    assert_eq!(store.read_all().unwrap(), actors[..1].to_vec());
}

#[test]
fn test_take_with_float_metadata_survives_rewrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("takes.jsonl");

    let mut draft = TakeDraft::new("greeting_001.wav");
    draft.duration_sec = Some(2.718281828459045);
    draft.sample_rate = Some(48_000);
    draft.generation = Some(Generation {
        provider: "elevenlabs".to_string(),
        params: json!({"stability": 0.35, "voice": "v1"}),
        generated_at: None,
    });
    let takes = vec![draft.into_take("m1", 1)];

    replace_all(&path, &takes).unwrap();
    let back: Vec<takebin::catalog_store::Take> = read_all(&path).unwrap();
    assert_eq!(back, takes);
}

#[test]
fn test_missing_and_empty_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scenes.jsonl");

    let none: Vec<Actor> = read_all(&path).unwrap();
    assert!(none.is_empty());

    ensure_exists(&path).unwrap();
    assert!(path.exists());
    assert_eq!(fs::read(&path).unwrap().len(), 0);

    append(&path, &Actor::new("A", "a")).unwrap();
    replace_all::<Actor>(&path, &[]).unwrap();
    assert_eq!(fs::read(&path).unwrap().len(), 0);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("actors.jsonl");
    let first = Actor::new("First", "first");
    let second = Actor::new("Second", "second");

    append(&path, &first).unwrap();
    {
        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"not json at all\n\n{\"id\": 42}\n").unwrap();
        // Truncated last line without a newline.
        file.write_all(b"{\"id\": \"cut").unwrap();
    }
    append(&path, &second).unwrap();

    let actors: Vec<Actor> = read_all(&path).unwrap();
    assert_eq!(actors, vec![first, second]);
}

#[test]
fn test_load_catalog_matches_what_was_written() {
    let project = TestProject::new();
    let sample = project.seed_sample();

    let catalog = load_catalog(project.paths()).unwrap();
    assert_eq!(catalog.count(EntityKind::Actor), 1);
    assert_eq!(catalog.count(EntityKind::Scene), 1);
    assert_eq!(catalog.count(EntityKind::Bin), 3);
    assert_eq!(catalog.count(EntityKind::Media), 3);
    assert_eq!(catalog.count(EntityKind::Take), GREETING_TAKES + 1);
    assert_eq!(catalog.get_scene(&sample.scene.id).unwrap().name, SCENE_NAME);
    assert_eq!(catalog, project.controller.catalog().unwrap());
    assert!(project.controller.check().unwrap().is_clean());
}

#[test]
fn test_global_owner_never_needs_an_owner_id() {
    let catalog = Catalog::default();

    let report = validate_references(&json!({"owner_type": "global"}), &catalog);
    assert!(report.valid);

    let report = validate_references(&json!({"owner_type": "global", "owner_id": "ghost"}), &catalog);
    assert!(report.valid);

    let report = validate_references(&json!({"owner_type": "actor"}), &catalog);
    assert!(!report.valid);
    assert!(matches!(
        report.errors[0],
        ValidationError::MissingOwnerId { .. }
    ));
}

#[test]
fn test_reference_validation_reports_every_violation() {
    let project = TestProject::new();
    let sample = project.seed_sample();
    let catalog = project.controller.catalog().unwrap();

    let candidate = json!({
        "bin_id": "no-such-bin",
        "media_id": sample.greeting.id,
        "scene_id": "no-such-scene",
        "actor_ids": [sample.actor.id, "no-such-actor"],
        "unrelated_field": "ignored",
    });
    let report = validate_references(&candidate, &catalog);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 3);

    let fields: Vec<String> = report
        .errors
        .iter()
        .filter_map(|e| match e {
            ValidationError::ForeignKeyViolation { field, .. } => Some(field.clone()),
            _ => None,
        })
        .collect();
    assert!(fields.contains(&"bin_id".to_string()));
    assert!(fields.contains(&"scene_id".to_string()));
    assert!(fields.contains(&"actor_ids[1]".to_string()));
}
