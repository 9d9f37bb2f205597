//! Spatial index queries on generated point clouds

use patternscan::spatial::{Point2, SpatialError, SpatialIndex, gaussian_weight};

/// Deterministic lattice with a little jitter, negative coordinates included.
fn lattice() -> Vec<(Point2, f32)> {
    let mut points = Vec::new();
    for i in -10..10 {
        for j in -10..10 {
            let jitter = ((i * 7 + j * 13) % 5) as f32 * 0.05;
            points.push((
                Point2::new(i as f32 * 0.75 + jitter, j as f32 * 0.75 - jitter),
                (i + j) as f32,
            ));
        }
    }
    points
}

#[test]
fn test_query_matches_brute_force() {
    let points = lattice();
    for cell_size in [0.3, 1.0, 2.5, 40.0] {
        let mut index = SpatialIndex::new(cell_size).unwrap();
        for &(p, v) in &points {
            index.insert(p, v);
        }

        for (query, radius) in [
            (Point2::new(0.0, 0.0), 1.0),
            (Point2::new(-3.3, 2.1), 2.2),
            (Point2::new(7.0, -7.0), 0.5),
            (Point2::new(100.0, 100.0), 3.0),
        ] {
            let mut found: Vec<(f32, f32)> = index
                .query_neighbors(query, radius, 1.0)
                .iter()
                .map(|n| (n.point.position.x, n.point.position.y))
                .collect();
            let mut expected: Vec<(f32, f32)> = points
                .iter()
                .filter(|(p, _)| p.distance_squared(&query) <= radius * radius)
                .map(|(p, _)| (p.x, p.y))
                .collect();

            found.sort_by(|a, b| a.partial_cmp(b).unwrap());
            expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(found, expected, "cell {cell_size}, query {query:?}");
        }
    }
}

#[test]
fn test_weights_follow_gaussian() {
    let mut index = SpatialIndex::new(1.0).unwrap();
    index.insert(Point2::new(0.0, 0.0), 1.0);
    index.insert(Point2::new(0.0, 1.5), 1.0);

    let neighbors = index.query_neighbors(Point2::new(0.0, 0.0), 2.0, 0.8);
    assert_eq!(neighbors.len(), 2);
    for n in neighbors {
        let expected = gaussian_weight(n.distance * n.distance, 0.8);
        assert!((n.weight - expected).abs() < 1e-6);
    }
}

#[test]
fn test_constant_field_is_preserved() {
    let mut index = SpatialIndex::new(0.5).unwrap();
    for &(p, _) in &lattice() {
        index.insert(p, 4.0);
    }
    let value = index
        .weighted_value(Point2::new(0.3, -0.2), 1.5, 0.7)
        .unwrap();
    assert!((value - 4.0).abs() < 1e-5);
    assert_eq!(index.weighted_value(Point2::new(500.0, 0.0), 1.0, 1.0), None);
}

#[test]
fn test_invalid_cell_sizes() {
    for size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(
            SpatialIndex::new(size),
            Err(SpatialError::InvalidCellSize(_))
        ));
    }
}
