//! Spatial index insert and radius query performance

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use patternscan::spatial::{Point2, SpatialIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_points(count: usize, extent: f32, rng: &mut StdRng) -> Vec<Point2> {
    (0..count)
        .map(|_| {
            Point2::new(
                rng.random_range(-extent..extent),
                rng.random_range(-extent..extent),
            )
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let points = random_points(10_000, 200.0, &mut rng);

    c.bench_function("spatial_insert_10k", |b| {
        b.iter(|| {
            let mut index = SpatialIndex::new(2.0).unwrap();
            for point in &points {
                index.insert(*point, 1.0);
            }
            black_box(index.cell_count())
        });
    });
}

fn bench_query(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let mut index = SpatialIndex::new(2.0).unwrap();
    for point in random_points(10_000, 200.0, &mut rng) {
        index.insert(point, rng.random());
    }
    let queries = random_points(100, 200.0, &mut rng);

    let mut group = c.benchmark_group("spatial_query");
    for radius in [1.0f32, 4.0, 16.0] {
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, &radius| {
            b.iter(|| {
                for query in &queries {
                    black_box(index.weighted_value(*query, radius, radius / 2.0));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query);
criterion_main!(benches);
