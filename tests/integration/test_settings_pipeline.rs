//! Settings file to trained state and back

use patternscan::io::Raster;
use patternscan::layer::LayerStack;
use patternscan::pipeline::{classify_raster, match_counts, train_all};
use patternscan::{EngineError, Settings};
use std::fs;
use tempfile::TempDir;

const GLYPH: &str = "\
..........
..####....
..#..#....
..####....
.....#....
.....#....
..........
..........
";

#[test]
fn test_configured_stack_trains_saves_and_classifies() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    let state_dir = temp_dir.path().join("state");

    fs::write(
        &config_path,
        format!(
            "state_dir = {:?}\n\n[impulse]\nheight = 8\n\n[scanline]\ndepth = 2\n",
            state_dir.display().to_string()
        ),
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.state_dir, state_dir);

    let raster = Raster::parse(GLYPH).unwrap();
    let mut stack = LayerStack::new(settings.stack_params()).unwrap();
    let summaries = train_all(&mut stack, std::slice::from_ref(&raster)).unwrap();
    assert_eq!(summaries.len(), 3);
    stack.save(&settings.state_dir).unwrap();

    let mut reopened = LayerStack::new(settings.stack_params()).unwrap();
    reopened.load(&settings.state_dir).unwrap();
    assert_eq!(reopened.level_sizes(), stack.level_sizes());

    let before = classify_raster(&mut stack, &raster).unwrap();
    let after = classify_raster(&mut reopened, &raster).unwrap();
    assert_eq!(before, after);
    assert!(!match_counts(&after).is_empty());
}

#[test]
fn test_raster_height_must_match_settings() {
    let settings = Settings::default();
    let mut stack = LayerStack::new(settings.stack_params()).unwrap();

    let raster = Raster::parse(GLYPH).unwrap();
    let error = classify_raster(&mut stack, &raster).unwrap_err();
    assert!(matches!(error, EngineError::Layer(_)));
    assert_eq!(error.status_code(), "COLUMN_LENGTH");
}
