//! Terminal display utilities for CLI output.
//!
//! Provides styled tables and a shared color theme.

pub mod tables;
pub mod theme;

pub use tables::{TableBuilder, create_level_table, create_match_table};
pub use theme::{Status, THEME, Theme};
