//! End-to-end runs over rasters and point sets.
//!
//! A raster is scanned left to right, one column per tick. After the last
//! column a single blank tick flushes activations the impulse layer is still
//! holding, so the rightmost column is summarized like every other.

use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::ClusterId;
use crate::config::SpatialConfig;
use crate::error::EngineResult;
use crate::io::Raster;
use crate::layer::{LayerError, LayerStack};
use crate::spatial::{Point2, SpatialIndex};

/// Blank ticks appended after each raster.
pub const FLUSH_TICKS: usize = 1;

/// One recognized cluster at a raster position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Tick on which the top level reported it; `width` for the flush tick.
    pub column: usize,
    pub row: usize,
    pub cluster: ClusterId,
}

/// Outcome of training one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainSummary {
    pub level: usize,
    pub rasters: usize,
    pub ticks: usize,
    pub clusters_before: usize,
    pub clusters_after: usize,
}

fn check_height(stack: &LayerStack, raster: &Raster) -> Result<(), LayerError> {
    if raster.height() != stack.height() {
        return Err(LayerError::ColumnLength {
            expected: stack.height(),
            actual: raster.height(),
        });
    }
    Ok(())
}

/// Runs every column of `raster` through the stack, calling `on_tick` with
/// the tick index and the top level's output.
fn scan<F>(stack: &mut LayerStack, raster: &Raster, mut on_tick: F) -> EngineResult<usize>
where
    F: FnMut(usize, &[Option<ClusterId>]),
{
    check_height(stack, raster)?;
    stack.reset();

    let blank = vec![false; raster.height()];
    let columns = raster
        .columns()
        .chain(std::iter::repeat_n(blank, FLUSH_TICKS));

    let mut ticks = 0;
    for (tick, column) in columns.enumerate() {
        let output = stack.step(&column)?;
        on_tick(tick, output);
        ticks += 1;
    }
    Ok(ticks)
}

/// Trains `level` on `rasters`, with every other level recognizing.
///
/// Heights are checked up front so a bad raster does not leave the level
/// half-trained. The stack is back in recognition mode when this returns,
/// also on error.
pub fn train_level(
    stack: &mut LayerStack,
    level: usize,
    rasters: &[Raster],
) -> EngineResult<TrainSummary> {
    for raster in rasters {
        check_height(stack, raster)?;
    }
    stack.set_training_level(level)?;

    let clusters_before = stack.level_sizes()[level];
    let scanned: EngineResult<usize> = rasters
        .iter()
        .try_fold(0, |ticks, raster| Ok(ticks + scan(stack, raster, |_, _| {})?));
    // Recognition is restored whether or not the scan finished
    stack.set_recognition();
    let ticks = scanned?;

    let summary = TrainSummary {
        level,
        rasters: rasters.len(),
        ticks,
        clusters_before,
        clusters_after: stack.level_sizes()[level],
    };
    info!(
        level,
        created = summary.clusters_after - summary.clusters_before,
        total = summary.clusters_after,
        "trained level"
    );
    Ok(summary)
}

/// Trains every level bottom-up, each on the same rasters.
pub fn train_all(stack: &mut LayerStack, rasters: &[Raster]) -> EngineResult<Vec<TrainSummary>> {
    (0..stack.levels())
        .map(|level| train_level(stack, level, rasters))
        .collect()
}

/// Recognizes `raster` with every level in recognition mode.
pub fn classify_raster(stack: &mut LayerStack, raster: &Raster) -> EngineResult<Vec<Detection>> {
    stack.set_recognition();

    let mut detections = Vec::new();
    scan(stack, raster, |column, output| {
        detections.extend(output.iter().enumerate().filter_map(|(row, slot)| {
            slot.map(|cluster| Detection {
                column,
                row,
                cluster,
            })
        }));
    })?;

    debug!(detections = detections.len(), "classified raster");
    Ok(detections)
}

/// Hits per cluster, most frequent first, ties by id.
pub fn match_counts(detections: &[Detection]) -> Vec<(ClusterId, usize)> {
    let mut counts = std::collections::BTreeMap::new();
    for detection in detections {
        *counts.entry(detection.cluster).or_insert(0usize) += 1;
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts
}

/// A point with its Gaussian-smoothed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Smoothed {
    pub point: Point2,
    pub raw: f32,
    pub value: f32,
}

/// Replaces each point's value by the weighted mean of its neighbourhood.
pub fn denoise(points: &[(Point2, f32)], spatial: &SpatialConfig) -> EngineResult<Vec<Smoothed>> {
    let mut index = SpatialIndex::new(spatial.cell_size)?;
    for &(point, value) in points {
        index.insert(point, value);
    }

    Ok(points
        .iter()
        .map(|&(point, raw)| Smoothed {
            point,
            raw,
            value: index
                .weighted_value(point, spatial.radius, spatial.sigma)
                .unwrap_or(raw),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterError;
    use crate::config::Settings;
    use crate::error::EngineError;
    use crate::layer::level_file_name;

    fn settings(height: usize) -> Settings {
        let mut settings = Settings::default();
        settings.impulse.height = height;
        settings
    }

    fn raster() -> Raster {
        Raster::parse(
            "\
........
........
..##....
...##...
....##..
.....#..
........
........
",
        )
        .unwrap()
    }

    #[test]
    fn test_train_then_classify() {
        let mut stack = LayerStack::new(settings(8).stack_params()).unwrap();
        let summaries = train_all(&mut stack, &[raster()]).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].ticks, 8 + FLUSH_TICKS);
        assert!(summaries.iter().all(|s| s.clusters_after > 0));

        let detections = classify_raster(&mut stack, &raster()).unwrap();
        assert!(!detections.is_empty());
        assert!(detections.iter().all(|d| d.row < 8 && d.column <= 8));
    }

    #[test]
    fn test_untrained_stack_detects_nothing() {
        let mut stack = LayerStack::new(settings(8).stack_params()).unwrap();
        let detections = classify_raster(&mut stack, &raster()).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_height_mismatch_leaves_level_untouched() {
        let mut stack = LayerStack::new(settings(8).stack_params()).unwrap();
        let short = Raster::parse("##\n##\n").unwrap();

        let result = train_level(&mut stack, 0, &[raster(), short]);
        assert!(matches!(
            result,
            Err(EngineError::Layer(LayerError::ColumnLength {
                expected: 8,
                actual: 2
            }))
        ));
        assert_eq!(stack.level_sizes(), vec![0, 0]);
    }

    #[test]
    fn test_failed_training_restores_recognition() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        // Level 0 has handed out every identity but the last
        std::fs::write(
            temp_dir.path().join(level_file_name(0)),
            "1\n1 0 0 0 0 0 4294967294 5 0 0 0 0 0\n",
        )
        .unwrap();
        std::fs::write(temp_dir.path().join(level_file_name(1)), "0\n").unwrap();

        let mut stack = LayerStack::new(settings(8).stack_params()).unwrap();
        stack.load(temp_dir.path()).unwrap();

        let result = train_level(&mut stack, 0, &[raster()]);
        assert!(matches!(
            result,
            Err(EngineError::Layer(LayerError::Cluster(
                ClusterError::IdentitiesExhausted { .. }
            )))
        ));
        assert!(!stack.impulse().is_learning());
        assert!(!stack.scanline(1).unwrap().is_learning());
        assert_eq!(stack.level_sizes(), vec![1, 0]);
    }

    #[test]
    fn test_match_counts_ordering() {
        let at = |cluster| Detection {
            column: 0,
            row: 0,
            cluster: ClusterId::new(cluster),
        };
        let counts = match_counts(&[at(2), at(1), at(2), at(3), at(1)]);
        assert_eq!(
            counts,
            vec![
                (ClusterId::new(1), 2),
                (ClusterId::new(2), 2),
                (ClusterId::new(3), 1)
            ]
        );
    }

    #[test]
    fn test_denoise_smooths_outlier() {
        let spatial = SpatialConfig {
            cell_size: 1.0,
            radius: 1.5,
            sigma: 1.0,
        };
        let points = vec![
            (Point2::new(0.0, 0.0), 1.0),
            (Point2::new(1.0, 0.0), 1.0),
            (Point2::new(0.0, 1.0), 1.0),
            (Point2::new(1.0, 1.0), 10.0),
        ];
        let smoothed = denoise(&points, &spatial).unwrap();
        assert_eq!(smoothed.len(), 4);
        assert!(smoothed[3].value < 10.0);
        assert!(smoothed[0].value > 1.0);
        assert_eq!(smoothed[3].raw, 10.0);
    }

    #[test]
    fn test_denoise_rejects_bad_cell_size() {
        let spatial = SpatialConfig {
            cell_size: 0.0,
            radius: 1.0,
            sigma: 1.0,
        };
        assert!(matches!(
            denoise(&[], &spatial),
            Err(EngineError::Spatial(_))
        ));
    }
}
