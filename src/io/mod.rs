//! Input/Output handling for the CLI.
//!
//! This module provides:
//! - Raster and point-file readers
//! - Unified output formatting (text, JSON)
//! - Consistent exit codes

pub mod exit_code;
pub mod format;
pub mod input;

pub use exit_code::ExitCode;
pub use format::{JsonResponse, OutputFormat};
pub use input::{InputError, Raster, parse_points, read_points};
