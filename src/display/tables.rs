//! Table formatting utilities for structured output.

use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::cluster::ClusterId;
use crate::layer::LevelStats;

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

/// Create a per-level summary table for `patternscan stats`.
pub fn create_level_table(stats: &[LevelStats]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        Cell::new("Level").add_attribute(Attribute::Bold),
        Cell::new("Kind").add_attribute(Attribute::Bold),
        Cell::new("Clusters").add_attribute(Attribute::Bold),
        Cell::new("Members").add_attribute(Attribute::Bold),
        Cell::new("Feature width").add_attribute(Attribute::Bold),
        Cell::new("Embedding").add_attribute(Attribute::Bold),
        Cell::new("Threshold").add_attribute(Attribute::Bold),
    ]);

    for level in stats {
        let kind = if level.level == 0 { "impulse" } else { "scan-line" };
        // Untrained levels stand out
        let clusters = if level.clusters == 0 {
            Cell::new(0).fg(Color::Yellow)
        } else {
            Cell::new(level.clusters)
        };
        table.add_row(vec![
            Cell::new(level.level),
            Cell::new(kind),
            clusters,
            Cell::new(level.members),
            Cell::new(level.feature_width),
            Cell::new(level.embedding_dim),
            Cell::new(format!("{:.3}", level.distance_threshold)),
        ]);
    }

    table.to_string()
}

/// Create a histogram table of recognized clusters, most frequent first.
pub fn create_match_table(counts: &[(ClusterId, usize)]) -> String {
    let total: usize = counts.iter().map(|(_, n)| n).sum();

    let mut builder = TableBuilder::new().set_headers(vec!["Cluster", "Hits", "Share"]);
    for (id, hits) in counts {
        let share = if total > 0 {
            *hits as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        builder = builder.add_row(vec![id.to_string(), hits.to_string(), format!("{share:.1}%")]);
    }
    builder.build()
}
