//! Integration test: model store persistence and replacement

use lumina::error::LuminaError;
use lumina::preprocessing::DataCleaner;
use lumina::store::{ModelStore, MODEL_FILE_NAME};
use lumina::table::{Column, RawTable};
use lumina::training::{train, FittedArtifact};
use std::sync::Arc;

fn artifact_for(target_scale: f64) -> FittedArtifact {
    let n = 25;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let z: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64).collect();
    let y: Vec<f64> = (0..n).map(|i| target_scale * i as f64).collect();
    let raw = RawTable::new(vec![
        Column::numeric("x", &x),
        Column::numeric("z", &z),
        Column::numeric("y", &y),
    ])
    .unwrap();
    train(&DataCleaner::new().clean(&raw)).unwrap().0
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::open(dir.path()).unwrap();
    assert!(matches!(store.load_latest(), Err(LuminaError::NoModelAvailable)));

    store.save(artifact_for(10.0)).unwrap();
    assert!(dir.path().join(MODEL_FILE_NAME).exists());
    assert_eq!(store.load_latest().unwrap().target, "y");
}

#[test]
fn test_reopen_warms_cache() {
    let dir = tempfile::tempdir().unwrap();
    let saved = {
        let store = ModelStore::open(dir.path()).unwrap();
        store.save(artifact_for(10.0)).unwrap()
    };

    let reopened = ModelStore::open(dir.path()).unwrap();
    assert!(reopened.is_cached());
    let loaded = reopened.load_latest().unwrap();
    assert_eq!(loaded.feature_schema, saved.feature_schema);
    assert_eq!(loaded.score, saved.score);
    assert_eq!(loaded.created_at, saved.created_at);
}

#[test]
fn test_last_writer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::open(dir.path()).unwrap();

    let first = store.save(artifact_for(10.0)).unwrap();
    let second = store.save(artifact_for(1000.0)).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&store.load_latest().unwrap(), &second));

    store.invalidate_cache();
    let from_disk = store.load_latest().unwrap();
    assert_eq!(from_disk.created_at, second.created_at);
}

#[test]
fn test_no_temporary_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::open(dir.path()).unwrap();
    store.save(artifact_for(10.0)).unwrap();
    store.save(artifact_for(20.0)).unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![MODEL_FILE_NAME.to_string()]);
}

#[test]
fn test_concurrent_readers_see_whole_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ModelStore::open(dir.path()).unwrap());
    store.save(artifact_for(10.0)).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for scale in [20.0, 30.0, 40.0] {
                store.save(artifact_for(scale)).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let artifact = store.load_latest().unwrap();
                    assert_eq!(artifact.feature_schema, vec!["x".to_string(), "z".to_string()]);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
