//! Artifact repository on disk

use std::fs;

use chrono::{TimeZone, Utc};
use iadess_core::{ArtifactRepository, ArtifactStore};
use iadess_types::{Artifact, ArtifactId, ArtifactKind, ArtifactStatus, ImageRef, Integrity, Realm};

fn artifact(id: &str, status: ArtifactStatus) -> Artifact {
    Artifact {
        id: ArtifactId::new(id),
        name: format!("ENTITIES_{}", id.to_ascii_uppercase()),
        kind: if status == ArtifactStatus::OmegaBound {
            ArtifactKind::OmegaBound
        } else {
            ArtifactKind::Artifact
        },
        origin: Realm::Entities,
        intent: "user schema".to_string(),
        code_shard: "struct User;".to_string(),
        image_url: Some(ImageRef::from_inline("image/png", "AAAA")),
        status,
        tags: vec!["ENTITIES".to_string(), "STRIKES_2".to_string()],
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        expansion_history: vec!["[Impact_1]: Crystallized 15 IQ-T logic at 75°C.".to_string()],
        integrity_score: Integrity::new(0.85).unwrap(),
        intelligence_cost: 30,
    }
}

#[test]
fn round_trip_preserves_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ArtifactRepository::new(dir.path().join("iadess_artifacts.json"));
    let artifacts = vec![
        artifact("b", ArtifactStatus::OmegaBound),
        artifact("a", ArtifactStatus::Honed),
    ];

    repo.save_all(&artifacts).unwrap();
    assert_eq!(repo.load(), artifacts);
}

#[test]
fn file_uses_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ArtifactRepository::new(dir.path().join("iadess_artifacts.json"));
    repo.save(&artifact("a", ArtifactStatus::Masterwork)).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(repo.path()).unwrap()).unwrap();
    let entry = &raw[0];
    assert_eq!(entry["codeShard"], "struct User;");
    assert_eq!(entry["status"], "MASTERWORK");
    assert_eq!(entry["origin"], "ENTITIES");
    assert!(entry.get("expansionHistory").is_some());
    assert!(entry.get("createdAt").is_some());
}

#[test]
fn store_restored_from_repository_keeps_creation_order() {
    let dir = tempfile::tempdir().unwrap();
    let repo = ArtifactRepository::new(dir.path().join("iadess_artifacts.json"));
    repo.save(&artifact("first", ArtifactStatus::Honed)).unwrap();
    repo.save(&artifact("second", ArtifactStatus::Masterwork)).unwrap();

    let store = ArtifactStore::from_persisted(repo.load());
    let ids: Vec<&str> = store.list().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[test]
fn corrupt_file_is_replaced_on_next_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iadess_artifacts.json");
    fs::write(&path, "[{\"broken\": ").unwrap();
    let repo = ArtifactRepository::new(&path);

    assert!(repo.load().is_empty());
    repo.save(&artifact("fresh", ArtifactStatus::Honed)).unwrap();
    assert_eq!(repo.load().len(), 1);
}
