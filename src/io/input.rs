//! Text input formats for the CLI.
//!
//! Rasters are text grids: one line per row, one character per column.
//! `.`, `0` and space are off; every other character is on. Short lines are
//! padded with off cells up to the widest line.
//!
//! Point files carry one `x y value` triple per line for spatial denoising.
//! Blank lines and lines starting with `#` are skipped.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::spatial::Point2;

/// Errors that can occur while reading CLI input files
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input: {path}\n{source}\nSuggestion: Check that the file exists and is readable")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Raster has no rows\nSuggestion: Provide at least one line of cells")]
    EmptyRaster,

    #[error("Malformed point at line {line}: {reason}\nSuggestion: Use one 'x y value' triple per line")]
    MalformedPoint { line: usize, reason: String },
}

fn read_text(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn is_on(cell: char) -> bool {
    !matches!(cell, '.' | '0' | ' ')
}

/// Binary image stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    height: usize,
    width: usize,
    cells: Vec<bool>,
}

impl Raster {
    pub fn parse(text: &str) -> Result<Self, InputError> {
        let rows: Vec<Vec<bool>> = text
            .lines()
            .map(|line| line.chars().map(is_on).collect())
            .collect();
        Self::from_rows(rows)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, InputError> {
        Self::parse(&read_text(path.as_ref())?)
    }

    /// Builds a raster from rows of cells, padding short rows with off cells.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, InputError> {
        if rows.is_empty() {
            return Err(InputError::EmptyRaster);
        }
        let height = rows.len();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut cells = Vec::with_capacity(height * width);
        for mut row in rows {
            row.resize(width, false);
            cells.extend(row);
        }

        Ok(Self {
            height,
            width,
            cells,
        })
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cell at (`row`, `col`); out-of-bounds cells are off.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.cells[row * self.width + col]
    }

    /// Column `x` top to bottom, the unit a layer consumes per tick.
    #[must_use]
    pub fn column(&self, x: usize) -> Vec<bool> {
        (0..self.height).map(|y| self.get(y, x)).collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = Vec<bool>> + '_ {
        (0..self.width).map(|x| self.column(x))
    }

    /// Number of on cells.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&on| on).count()
    }
}

/// Parses `x y value` lines.
pub fn parse_points(text: &str) -> Result<Vec<(Point2, f32)>, InputError> {
    let mut points = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = |reason: String| InputError::MalformedPoint {
            line: index + 1,
            reason,
        };

        let values = line
            .split_whitespace()
            .map(|token| match token.parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(malformed(format!("'{token}' is not a finite number"))),
            })
            .collect::<Result<Vec<f32>, _>>()?;

        match values.as_slice() {
            &[x, y, value] => points.push((Point2::new(x, y), value)),
            other => {
                return Err(malformed(format!(
                    "expected 3 values, found {}",
                    other.len()
                )));
            }
        }
    }

    Ok(points)
}

pub fn read_points(path: impl AsRef<Path>) -> Result<Vec<(Point2, f32)>, InputError> {
    parse_points(&read_text(path.as_ref())?)
}
