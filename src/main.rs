//! CLI entry point for the pattern scanner.
//!
//! Provides commands for training layer stacks on text rasters, classifying
//! rasters with saved state, inspecting that state, and denoising point sets.

use anyhow::Result;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use patternscan::display::{Status, THEME, create_level_table, create_match_table};
use patternscan::io::{ExitCode, JsonResponse, OutputFormat, Raster, read_points};
use patternscan::layer::level_file_name;
use patternscan::pipeline::{self, Detection};
use patternscan::{EngineError, LayerStack, Settings};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::filter::LevelFilter;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Layered scan-line pattern classifier
#[derive(Parser)]
#[command(
    name = "patternscan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Layered scan-line pattern classifier",
    long_about = "Learn recurring local patterns in binary rasters one column at a time, then recognize them.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .patternscan directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .patternscan/settings.toml")]
    Config,

    /// Learn clusters from rasters
    #[command(
        about = "Train levels on text rasters and save the state",
        after_help = "Examples:\n  patternscan train digits/*.txt\n  patternscan train --level 1 digits/*.txt\n  patternscan train --fresh samples/a.txt"
    )]
    Train {
        /// Raster files (one text line per row)
        #[arg(required = true)]
        rasters: Vec<PathBuf>,

        /// Train only this level (0 is the impulse layer); all levels when omitted
        #[arg(short, long)]
        level: Option<usize>,

        /// Ignore saved state and start from empty stores
        #[arg(long)]
        fresh: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Recognize patterns with saved state
    #[command(
        about = "Classify rasters with the trained stack",
        after_help = "Exit codes:\n  0  something was recognized\n  3  nothing was recognized"
    )]
    Classify {
        /// Raster files
        #[arg(required = true)]
        rasters: Vec<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show per-level cluster statistics
    #[command(about = "Summarize the saved cluster state")]
    Stats {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Gaussian-smooth a point set
    #[command(
        about = "Denoise 'x y value' points with the spatial index",
        after_help = "Examples:\n  patternscan denoise edges.txt\n  patternscan denoise edges.txt --radius 3 --sigma 1.5"
    )]
    Denoise {
        /// Point file, one 'x y value' triple per line
        points: PathBuf,

        /// Query radius (overrides config)
        #[arg(long)]
        radius: Option<f32>,

        /// Gaussian sigma (overrides config)
        #[arg(long)]
        sigma: Option<f32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct RasterResult {
    path: PathBuf,
    detections: Vec<Detection>,
}

fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured.parse::<LevelFilter>().unwrap_or(LevelFilter::WARN),
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load_from(path).map_err(|e| {
            anyhow::anyhow!("Configuration error loading from {}: {e}", path.display())
        }),
        None => Ok(Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        })),
    }
}

fn read_rasters(paths: &[PathBuf]) -> Result<Vec<Raster>, EngineError> {
    paths
        .iter()
        .map(|path| Raster::read(path).map_err(EngineError::from))
        .collect()
}

fn has_saved_state(dir: &Path) -> bool {
    dir.join(level_file_name(0)).exists()
}

/// Builds a stack from settings and loads the saved state when present.
fn open_stack(settings: &Settings, require_state: bool) -> Result<LayerStack, EngineError> {
    let mut stack = LayerStack::new(settings.stack_params())?;

    if has_saved_state(&settings.state_dir) {
        stack.load(&settings.state_dir)?;
        debug!(sizes = ?stack.level_sizes(), "opened saved state");
    } else if require_state {
        // Surface the missing file through the store's own error
        stack.load(&settings.state_dir)?;
    }
    Ok(stack)
}

fn print_json<T: Serialize>(response: &JsonResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

fn run_train(
    settings: &Settings,
    rasters: &[PathBuf],
    level: Option<usize>,
    fresh: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    let rasters = read_rasters(rasters)?;
    let mut stack = if fresh {
        LayerStack::new(settings.stack_params()).map_err(EngineError::from)?
    } else {
        open_stack(settings, false)?
    };

    let summaries = match level {
        Some(level) => vec![pipeline::train_level(&mut stack, level, &rasters)?],
        None => pipeline::train_all(&mut stack, &rasters)?,
    };
    stack.save(&settings.state_dir).map_err(EngineError::from)?;

    if format.is_json() {
        print_json(&JsonResponse::success(&summaries))?;
    } else {
        for summary in &summaries {
            let line = format!(
                "level {}: {} clusters ({} new) from {} ticks",
                summary.level,
                summary.clusters_after,
                summary.clusters_after - summary.clusters_before,
                summary.ticks
            );
            println!("{}", THEME.status(Status::Done, &line));
        }
        println!(
            "Saved state to {}",
            THEME.paint(&THEME.path, settings.state_dir.display())
        );
    }
    Ok(ExitCode::Success)
}

fn run_classify(settings: &Settings, paths: &[PathBuf], format: OutputFormat) -> Result<ExitCode> {
    let rasters = read_rasters(paths)?;
    let mut stack = open_stack(settings, true)?;

    let mut results = Vec::with_capacity(rasters.len());
    for (path, raster) in paths.iter().zip(&rasters) {
        results.push(RasterResult {
            path: path.clone(),
            detections: pipeline::classify_raster(&mut stack, raster)?,
        });
    }

    let total: usize = results.iter().map(|r| r.detections.len()).sum();
    let code = ExitCode::from_match_count(total);

    if format.is_json() {
        print_json(&JsonResponse::with_code(code, &results))?;
        return Ok(code);
    }

    for result in &results {
        println!("{}", THEME.paint(&THEME.heading, result.path.display()));
        if result.detections.is_empty() {
            println!("{}", THEME.status(Status::Empty, "nothing recognized"));
        } else {
            println!("{}", create_match_table(&pipeline::match_counts(&result.detections)));
        }
    }
    Ok(code)
}

fn run_stats(settings: &Settings, format: OutputFormat) -> Result<ExitCode> {
    let stack = open_stack(settings, false)?;
    let stats = stack.level_stats();

    if format.is_json() {
        print_json(&JsonResponse::success(&stats))?;
    } else {
        if !has_saved_state(&settings.state_dir) {
            println!(
                "{}",
                THEME.status(Status::Empty, "no saved state, showing an untrained stack")
            );
        }
        println!("{}", create_level_table(&stats));
    }
    Ok(ExitCode::Success)
}

fn run_denoise(
    settings: &Settings,
    path: &Path,
    radius: Option<f32>,
    sigma: Option<f32>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let mut spatial = settings.spatial.clone();
    if let Some(radius) = radius {
        spatial.radius = radius;
    }
    if let Some(sigma) = sigma {
        spatial.sigma = sigma;
    }

    let points = read_points(path).map_err(EngineError::from)?;
    let smoothed = pipeline::denoise(&points, &spatial)?;

    if format.is_json() {
        print_json(&JsonResponse::success(&smoothed))?;
    } else {
        for s in &smoothed {
            println!("{} {} {}", s.point.x, s.point.y, s.value);
        }
    }
    Ok(ExitCode::from_match_count(smoothed.len()))
}

fn run(cli: &Cli, settings: &Settings) -> Result<ExitCode> {
    match &cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(".", *force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize your settings.");
            Ok(ExitCode::Success)
        }
        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(settings)?);
            Ok(ExitCode::Success)
        }
        Commands::Train {
            rasters,
            level,
            fresh,
            json,
        } => run_train(
            settings,
            rasters,
            *level,
            *fresh,
            OutputFormat::from_json_flag(*json),
        ),
        Commands::Classify { rasters, json } => {
            run_classify(settings, rasters, OutputFormat::from_json_flag(*json))
        }
        Commands::Stats { json } => run_stats(settings, OutputFormat::from_json_flag(*json)),
        Commands::Denoise {
            points,
            radius,
            sigma,
            json,
        } => run_denoise(
            settings,
            points,
            *radius,
            *sigma,
            OutputFormat::from_json_flag(*json),
        ),
    }
}

fn wants_json(command: &Commands) -> bool {
    match command {
        Commands::Train { json, .. }
        | Commands::Classify { json, .. }
        | Commands::Stats { json }
        | Commands::Denoise { json, .. } => *json,
        Commands::Init { .. } | Commands::Config => false,
    }
}

fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", THEME.status(Status::Failed, &format!("{e:#}")));
            std::process::exit(ExitCode::ConfigError.into());
        }
    };
    init_logging(
        if settings.debug { cli.verbose.max(2) } else { cli.verbose },
        &settings.logging.level,
    );

    let initialized = match cli.command {
        Commands::Init { .. } => Ok(()),
        _ => Settings::check_init(),
    };
    if let Err(warning) = initialized {
        debug!("{warning}, using defaults and PS_ overrides");
    }

    let code = match run(&cli, &settings) {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<EngineError>() {
            Some(engine) => {
                let code = ExitCode::from_error(engine);
                if wants_json(&cli.command) {
                    // Best effort: the error is reported either way
                    let _ = print_json(&JsonResponse::from_error(engine));
                } else {
                    eprintln!("{}", THEME.status(Status::Failed, &engine.to_string()));
                    for suggestion in engine.recovery_suggestions() {
                        eprintln!("  {}", THEME.paint(&THEME.hint, suggestion));
                    }
                }
                warn!(code = engine.status_code(), "command failed");
                code
            }
            None => {
                eprintln!("{}", THEME.status(Status::Failed, &format!("{e:#}")));
                ExitCode::GeneralError
            }
        },
    };

    std::process::exit(code.into());
}
