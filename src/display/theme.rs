//! Terminal styling for command output.

use console::Style;
use std::io::IsTerminal;
use std::sync::LazyLock;

/// Shared theme used by every command.
pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::default);

/// Outcome shown in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Empty,
    Failed,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Self::Done => "✓",
            Self::Empty => "⚠",
            Self::Failed => "✗",
        }
    }

    /// Failures go to stderr, so that is the stream whose terminal matters.
    fn stream_is_terminal(self) -> bool {
        match self {
            Self::Failed => std::io::stderr().is_terminal(),
            Self::Done | Self::Empty => std::io::stdout().is_terminal(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub done: Style,
    pub empty: Style,
    pub failed: Style,
    /// Raster path above each result
    pub heading: Style,
    /// Recovery hints under an error
    pub hint: Style,
    pub path: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            done: Style::new().green().bright(),
            empty: Style::new().yellow().bright(),
            failed: Style::new().red().bright(),
            heading: Style::new().cyan().bold(),
            hint: Style::new().dim(),
            path: Style::new().magenta(),
        }
    }
}

impl Theme {
    /// Renders `text` behind the marker for `status`.
    pub fn status(&self, status: Status, text: &str) -> String {
        let line = format!("{} {text}", status.marker());
        if Self::colors_enabled(status.stream_is_terminal()) {
            let style = match status {
                Status::Done => &self.done,
                Status::Empty => &self.empty,
                Status::Failed => &self.failed,
            };
            style.apply_to(line).to_string()
        } else {
            line
        }
    }

    /// Applies `style` when stdout is a color-capable terminal.
    pub fn paint<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if Self::colors_enabled(std::io::stdout().is_terminal()) {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn colors_enabled(is_terminal: bool) -> bool {
        is_terminal && std::env::var_os("NO_COLOR").is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines_keep_text() {
        let theme = Theme::default();
        assert!(theme.status(Status::Done, "trained").contains("✓ trained"));
        assert!(theme.status(Status::Empty, "nothing").contains("nothing"));
        assert!(theme.status(Status::Failed, "broken").contains("broken"));
    }

    #[test]
    fn test_plain_output_off_terminal() {
        assert!(!Theme::colors_enabled(false));
        assert_eq!(Theme::default().paint(&Style::new(), 42), "42");
    }
}
