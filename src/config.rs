//! Configuration module for the pattern scanner.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PS_` and use double underscores
//! to separate nested levels:
//! - `PS_CLUSTERING__DISTANCE_THRESHOLD=0.2` sets `clustering.distance_threshold`
//! - `PS_IMPULSE__HEIGHT=64` sets `impulse.height`
//! - `PS_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cluster::DEFAULT_EMBEDDING_DIM;
use crate::layer::{ImpulseParams, LayerParams, StackParams};

const CONFIG_DIR: &str = ".patternscan";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding one cluster file per level
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Cluster store settings shared by every level
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Bottom layer settings
    #[serde(default)]
    pub impulse: ImpulseConfig,

    /// Scan-line layer settings
    #[serde(default)]
    pub scanline: ScanLineConfig,

    /// Spatial index settings
    #[serde(default)]
    pub spatial: SpatialConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClusteringConfig {
    /// Maximum distance at which a vector joins an existing cluster
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,

    /// Width of the embedding each cluster hands to the level above
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImpulseConfig {
    /// Rows per column; every raster must have exactly this many rows
    #[serde(default = "default_height")]
    pub height: usize,

    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,

    /// Decayed values below this floor drop to zero
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold: f32,

    #[serde(default = "default_impulse_strength")]
    pub impulse_strength: f32,

    #[serde(default = "default_kernel_half_width")]
    pub kernel_half_width: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScanLineConfig {
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f32,

    #[serde(default = "default_kernel_half_width")]
    pub kernel_half_width: usize,

    /// Number of scan-line levels stacked above the impulse layer
    #[serde(default = "default_depth")]
    pub depth: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpatialConfig {
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,

    #[serde(default = "default_radius")]
    pub radius: f32,

    #[serde(default = "default_sigma")]
    pub sigma: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `-v` is not given: error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_state_dir() -> PathBuf {
    PathBuf::from(".patternscan/state")
}
fn default_false() -> bool {
    false
}
fn default_distance_threshold() -> f32 {
    0.16
}
fn default_embedding_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}
fn default_height() -> usize {
    400
}
fn default_decay_rate() -> f32 {
    0.9
}
fn default_memory_threshold() -> f32 {
    0.2
}
fn default_impulse_strength() -> f32 {
    1.0
}
fn default_kernel_half_width() -> usize {
    2
}
fn default_depth() -> usize {
    1
}
fn default_cell_size() -> f32 {
    2.0
}
fn default_radius() -> f32 {
    2.0
}
fn default_sigma() -> f32 {
    1.0
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            state_dir: default_state_dir(),
            debug: false,
            clustering: ClusteringConfig::default(),
            impulse: ImpulseConfig::default(),
            scanline: ScanLineConfig::default(),
            spatial: SpatialConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            height: default_height(),
            decay_rate: default_decay_rate(),
            memory_threshold: default_memory_threshold(),
            impulse_strength: default_impulse_strength(),
            kernel_half_width: default_kernel_half_width(),
        }
    }
}

impl Default for ScanLineConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            kernel_half_width: default_kernel_half_width(),
            depth: default_depth(),
        }
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            radius: default_radius(),
            sigma: default_sigma(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `PS_` variables with `__` as the nesting separator.
fn env_provider() -> Env {
    Env::prefixed("PS_").map(|key| key.as_str().to_lowercase().replace("__", ".").into())
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring `PS_` overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(env_provider())
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a `.patternscan` directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where `.patternscan` is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Check if configuration is properly initialized
    pub fn check_init() -> Result<(), String> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join(CONFIG_FILE));

        if !config_path.exists() {
            return Err("No configuration file found".to_string());
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'patternscan init --force' to regenerate."
                    ));
                }
            }
            Err(e) => {
                return Err(format!("Cannot read configuration file: {e}"));
            }
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments in `dir`
    pub fn init_config_file(
        dir: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# Pattern scanner configuration

# Version of the configuration schema
version = 1

# Directory holding level_<n>.clusters files (relative to the working directory)
state_dir = ".patternscan/state"

# Global debug mode
debug = false

[clustering]
# A vector joins its nearest cluster when the distance is at most this value
distance_threshold = 0.16

# Width of the embedding each cluster hands to the level above
embedding_dim = 5

[impulse]
# Rows per column; rasters must have exactly this many rows
height = 400

# Memory multiplier applied every tick, in (0, 1]
decay_rate = 0.9

# Decayed values below this floor drop to zero
memory_threshold = 0.2

# Memory value written when a row activates
impulse_strength = 1.0

# Windows cover 2 * kernel_half_width + 1 rows
kernel_half_width = 2

[scanline]
decay_rate = 0.9
kernel_half_width = 2

# Scan-line levels stacked above the impulse layer
depth = 1

[spatial]
# Grid cell size; close to the query radius works best
cell_size = 2.0
radius = 2.0

# Gaussian width; zero or negative turns queries into a hard cutoff
sigma = 1.0

[logging]
# error, warn, info, debug or trace
level = "warn"
"#;

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }

    /// Layer parameters for a stack built from these settings
    #[must_use]
    pub fn stack_params(&self) -> StackParams {
        let impulse_layer = LayerParams {
            height: self.impulse.height,
            decay_rate: self.impulse.decay_rate,
            half_width: self.impulse.kernel_half_width,
            distance_threshold: self.clustering.distance_threshold,
            embedding_dim: self.clustering.embedding_dim,
            learning: false,
        };

        StackParams {
            impulse: ImpulseParams {
                layer: impulse_layer,
                memory_threshold: self.impulse.memory_threshold,
                impulse_strength: self.impulse.impulse_strength,
            },
            scanline: LayerParams {
                decay_rate: self.scanline.decay_rate,
                half_width: self.scanline.kernel_half_width,
                ..impulse_layer
            },
            depth: self.scanline.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.state_dir, PathBuf::from(".patternscan/state"));
        assert_eq!(settings.clustering.distance_threshold, 0.16);
        assert_eq!(settings.impulse.height, 400);
        assert_eq!(settings.scanline.depth, 1);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[clustering]
distance_threshold = 0.3

[impulse]
height = 64
kernel_half_width = 1

[spatial]
sigma = 0.0
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.clustering.distance_threshold, 0.3);
        assert_eq!(settings.impulse.height, 64);
        assert_eq!(settings.impulse.kernel_half_width, 1);
        assert_eq!(settings.spatial.sigma, 0.0);
        // Untouched fields keep their defaults
        assert_eq!(settings.impulse.decay_rate, 0.9);
        assert_eq!(settings.clustering.embedding_dim, 5);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.scanline.depth = 3;
        settings.debug = true;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.scanline.depth, 3);
        assert!(loaded.debug);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".patternscan/settings.toml"));

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Settings = toml::from_str(&content).unwrap();
        let defaults = Settings::default();
        assert_eq!(parsed.impulse.height, defaults.impulse.height);
        assert_eq!(parsed.spatial.cell_size, defaults.spatial.cell_size);
        assert_eq!(parsed.logging.level, defaults.logging.level);

        // Second init without force refuses to overwrite
        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_stack_params() {
        let mut settings = Settings::default();
        settings.impulse.height = 32;
        settings.scanline.kernel_half_width = 3;
        settings.scanline.depth = 2;

        let params = settings.stack_params();
        assert_eq!(params.impulse.layer.height, 32);
        assert_eq!(params.scanline.height, 32);
        assert_eq!(params.impulse.layer.half_width, 2);
        assert_eq!(params.scanline.half_width, 3);
        assert_eq!(params.depth, 2);
        assert!(!params.scanline.learning);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[spatial]\nradius = 4.0\ncell_size = 4.0\n").unwrap();

        unsafe {
            std::env::set_var("PS_SPATIAL__RADIUS", "8.0");
        }

        let settings = Settings::load_from(&config_path).unwrap();

        unsafe {
            std::env::remove_var("PS_SPATIAL__RADIUS");
        }

        // Environment variable should override config file
        assert_eq!(settings.spatial.radius, 8.0);
        // Config file value should be used when no env var
        assert_eq!(settings.spatial.cell_size, 4.0);
    }

    #[test]
    fn test_partial_config_with_figment() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .extract()
            .unwrap();

        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.impulse.memory_threshold, 0.2);
    }
}
