//! Layer stack behaviour across training, recognition and persistence

use patternscan::cluster::{ClusterId, ClusterStore};
use patternscan::layer::{
    ImpulseParams, LayerError, LayerParams, LayerStack, ScanLineLayer, StackParams,
    level_file_name,
};
use tempfile::TempDir;

const HEIGHT: usize = 20;

fn params(depth: usize) -> StackParams {
    let layer = LayerParams {
        height: HEIGHT,
        decay_rate: 0.9,
        half_width: 2,
        distance_threshold: 0.16,
        embedding_dim: 5,
        learning: false,
    };
    StackParams {
        impulse: ImpulseParams {
            layer,
            memory_threshold: 0.2,
            impulse_strength: 1.0,
        },
        scanline: layer,
        depth,
    }
}

/// A vertical bar followed by a horizontal run, then blank columns.
fn shape() -> Vec<Vec<bool>> {
    let mut columns = Vec::new();
    let mut bar = vec![false; HEIGHT];
    for cell in bar.iter_mut().take(14).skip(6) {
        *cell = true;
    }
    columns.push(bar);
    for _ in 0..5 {
        let mut run = vec![false; HEIGHT];
        run[10] = true;
        columns.push(run);
    }
    columns.extend(std::iter::repeat_n(vec![false; HEIGHT], 2));
    columns
}

fn feed(stack: &mut LayerStack) -> usize {
    stack.reset();
    shape()
        .iter()
        .map(|column| stack.step(column).unwrap().iter().flatten().count())
        .sum()
}

fn trained(depth: usize) -> LayerStack {
    let mut stack = LayerStack::new(params(depth)).unwrap();
    for level in 0..stack.levels() {
        stack.set_training_level(level).unwrap();
        feed(&mut stack);
    }
    stack.set_recognition();
    stack
}

#[test]
fn test_recognition_after_greedy_training() {
    let mut stack = trained(2);
    assert!(stack.level_sizes().iter().all(|&n| n > 0));
    assert!(feed(&mut stack) > 0);
}

#[test]
fn test_recognition_does_not_learn() {
    let mut stack = trained(1);
    let sizes = stack.level_sizes();
    feed(&mut stack);
    feed(&mut stack);
    assert_eq!(stack.level_sizes(), sizes);
}

#[test]
fn test_persisted_stack_recognizes_the_same() {
    let temp_dir = TempDir::new().unwrap();
    let mut original = trained(2);
    original.save(temp_dir.path()).unwrap();

    let mut restored = LayerStack::new(params(2)).unwrap();
    restored.load(temp_dir.path()).unwrap();

    let mut expected = Vec::new();
    original.reset();
    for column in shape() {
        expected.push(original.step(&column).unwrap().to_vec());
    }

    restored.reset();
    for (column, want) in shape().iter().zip(expected) {
        assert_eq!(restored.step(column).unwrap(), want.as_slice());
    }
}

#[test]
fn test_state_from_other_geometry_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    trained(1).save(temp_dir.path()).unwrap();

    // Wider kernels make every saved record too short
    let mut wide = params(1);
    wide.impulse.layer.half_width = 3;
    wide.scanline.half_width = 3;
    let mut stack = LayerStack::new(wide).unwrap();
    assert!(stack.load(temp_dir.path()).is_err());
    assert_eq!(stack.level_sizes(), vec![0, 0]);
}

#[test]
fn test_chained_scanline_layers_by_hand() {
    // Two scan-line layers driven manually from a fixed lower store
    let mut lower = ClusterStore::with_threshold(0.1).unwrap();
    lower.admit(&[1.0, 0.0, 0.0, 0.0, 0.0]).unwrap();

    let layer = LayerParams {
        learning: true,
        ..params(0).scanline
    };
    let mut first = ScanLineLayer::new(layer, lower.embedding_dim()).unwrap();
    let mut second = ScanLineLayer::new(layer, 5).unwrap();

    let mut events = vec![None; HEIGHT];
    events[8] = Some(ClusterId::new(0));

    first.step(&events, &lower).unwrap();
    first.set_learning(false);
    // Row 8 is re-activated, its neighbours stay at zero: same window
    let out = first.step(&events, &lower).unwrap().to_vec();
    assert_eq!(out[8], Some(ClusterId::new(0)));
    assert_eq!(out.iter().flatten().count(), 1);

    second.step(&out, first.store()).unwrap();
    assert_eq!(second.store().len(), 1);
    assert_eq!(
        second.store().clusters()[0].centroid(),
        &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    );
}

#[test]
fn test_level_files_and_errors() {
    let temp_dir = TempDir::new().unwrap();
    let stack = trained(1);
    stack.save(temp_dir.path().join("nested/state")).unwrap();
    assert!(
        temp_dir
            .path()
            .join("nested/state")
            .join(level_file_name(1))
            .exists()
    );

    let mut stack = stack;
    assert!(matches!(
        stack.step(&[false; 3]),
        Err(LayerError::ColumnLength {
            expected: HEIGHT,
            actual: 3
        })
    ));
}
