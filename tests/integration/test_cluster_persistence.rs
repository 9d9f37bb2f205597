//! Cluster store persistence through the public API

use patternscan::cluster::{ClusterError, ClusterId, ClusterStore, EmbeddingSource};
use std::fs;
use tempfile::TempDir;

fn trained_store() -> ClusterStore {
    let mut store = ClusterStore::with_threshold(0.2).unwrap();
    for pattern in [
        [0.0, 0.0, 1.0, 0.0, 0.0],
        [0.0, 0.1, 1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.9, 0.9],
    ] {
        store.admit(&pattern).unwrap();
    }
    store
}

#[test]
fn test_reload_classifies_identically() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("level_0.clusters");

    let store = trained_store();
    assert_eq!(store.len(), 3);
    store.save(&path).unwrap();

    let mut restored = ClusterStore::with_threshold(0.2).unwrap();
    restored.load(&path).unwrap();

    assert_eq!(restored.len(), store.len());
    assert_eq!(restored.next_id(), ClusterId::new(3));
    for sample in [
        [0.0, 0.05, 1.0, 0.0, 0.0],
        [1.0, 0.9, 0.0, 0.0, 0.0],
        [5.0, 5.0, 5.0, 5.0, 5.0],
    ] {
        assert_eq!(restored.classify(&sample).unwrap(), store.classify(&sample).unwrap());
    }
    for id in 0..3 {
        let id = ClusterId::new(id);
        assert_eq!(
            EmbeddingSource::embedding_of(&restored, id).unwrap(),
            store.embedding_of(id).unwrap()
        );
    }
}

#[test]
fn test_file_is_line_oriented_text() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.clusters");
    trained_store().save(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "3");
    assert_eq!(lines.len(), 4);
    // count, 5 centroid values, id, length, 5 embedding values
    assert!(lines[1..].iter().all(|l| l.split_whitespace().count() == 13));
}

#[test]
fn test_truncated_file_keeps_previous_state() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.clusters");
    trained_store().save(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let truncated: String = content.lines().take(2).collect::<Vec<_>>().join("\n");
    fs::write(&path, truncated).unwrap();

    let mut store = trained_store();
    let before = store.clusters().to_vec();
    let result = store.load(&path);
    assert!(matches!(
        result,
        Err(ClusterError::MalformedPersistedData { .. })
    ));
    assert_eq!(store.clusters(), before.as_slice());
}

#[test]
fn test_learning_continues_after_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.clusters");
    trained_store().save(&path).unwrap();

    let mut store = ClusterStore::with_threshold(0.2).unwrap();
    store.load(&path).unwrap();
    let id = store.admit(&[9.0, 9.0, 9.0, 9.0, 9.0]).unwrap();
    assert_eq!(id, ClusterId::new(3));
    assert_eq!(store.embedding_of(id).unwrap(), &[9.0, 9.0, 9.0, 9.0, 9.0]);
}
