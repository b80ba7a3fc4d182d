//! Integration tests for preset persistence.
//!
//! These run against on-disk SQLite files in a temporary directory so they
//! exercise the same path the CLI takes between invocations.

use std::sync::Arc;
use std::thread;

use breathcount_core::preset::{PresetCollection, PresetEdit, Segment};
use breathcount_core::storage::{Database, PresetStore, SCHEMA_VERSION, VERSION_KEY};

fn store_in(dir: &tempfile::TempDir) -> PresetStore {
    PresetStore::open_at(&dir.path().join("breathcount.db")).unwrap()
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut collection = store.load().unwrap();
    let mut custom = collection.presets()[0].clone();
    custom.id = "preset_box".into();
    custom.name = "Box Breathing".into();
    custom.segments = vec![
        Segment::new("Inhale", 4.0, "ding").unwrap(),
        Segment::new("Hold", 4.0, "windchime").unwrap(),
        Segment::new("Exhale", 4.0, "metallophone").unwrap(),
        Segment::new("Hold", 4.0, "ding").unwrap(),
    ];
    custom.repeat_count = 8;
    collection.upsert(custom);

    store.save(&collection).unwrap();
    drop(store);

    let reopened = store_in(&dir);
    assert_eq!(reopened.load().unwrap(), collection);
}

#[test]
fn test_version_mismatch_returns_single_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("breathcount.db");
    {
        let store = PresetStore::open_at(&path).unwrap();
        store.create_preset("Mine").unwrap();
        store.create_preset("Yours").unwrap();
    }
    {
        let db = Database::open_at(&path).unwrap();
        db.kv_set(VERSION_KEY, "0.9").unwrap();
    }

    let store = PresetStore::open_at(&path).unwrap();
    let collection = store.load().unwrap();
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.presets()[0].repeat_count, 25);
    assert_eq!(collection, PresetCollection::seeded());

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.kv_get(VERSION_KEY).unwrap().as_deref(), Some(SCHEMA_VERSION));
}

#[test]
fn test_edits_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let preset = store.create_preset("Evening").unwrap();
    for (name, secs) in [("In", 3.0), ("Out", 6.0)] {
        store
            .apply_edit(
                &preset.id,
                &PresetEdit::AddSegment {
                    name: name.into(),
                    duration_secs: secs,
                },
            )
            .unwrap();
    }
    store
        .apply_edit(&preset.id, &PresetEdit::SetRepeatCount { count: 12 })
        .unwrap();
    drop(store);

    let loaded = store_in(&dir).get(&preset.id).unwrap().unwrap();
    assert_eq!(loaded.repeat_count, 12);
    assert_eq!(loaded.segments.len(), 2);
    assert_eq!(loaded.segments[0].cue_id(), "ding");
    assert_eq!(loaded.segments[1].cue_id(), "windchime");
}

#[test]
fn test_concurrent_edits_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));
    store.load().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .apply_edit(
                        "preset_1",
                        &PresetEdit::AddSegment {
                            name: format!("Extra{i}"),
                            duration_secs: 1.0,
                        },
                    )
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let preset = store.get("preset_1").unwrap().unwrap();
    assert_eq!(preset.segments.len(), 3 + 8);
}

#[test]
fn test_invalid_edit_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let before = store.load().unwrap();

    let err = store
        .apply_edit(
            "preset_1",
            &PresetEdit::EditSegment {
                index: 0,
                name: "Inhale".into(),
                duration_secs: 0.0,
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), Some("non_positive_duration"));
    assert_eq!(store.load().unwrap(), before);
}
