//! Format definitions for CLI output.
//!
//! Provides structured format types for consistent JSON responses.

use crate::error::EngineError;
use crate::io::exit_code::ExitCode;
use serde::Serialize;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// JSON for tool integration
    Json,
}

impl OutputFormat {
    /// Create format from JSON flag.
    #[must_use]
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    /// Check if format is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Standard JSON response format.
///
/// Provides consistent structure for both success and error responses.
#[derive(Debug, Serialize)]
pub struct JsonResponse<T = serde_json::Value>
where
    T: Serialize,
{
    /// Status: "success" or "error"
    pub status: String,

    /// Result code (e.g., "OK", "NOT_FOUND", "MALFORMED_STATE")
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Actual data payload (only for success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Recovery suggestions (only for errors)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,

    /// Exit code for shell scripts
    pub exit_code: u8,
}

impl<T> JsonResponse<T>
where
    T: Serialize,
{
    /// Create a success response with data.
    pub fn success(data: T) -> Self {
        Self::with_code(ExitCode::Success, data)
    }

    /// Create a response carrying data with a non-error exit code such as `NotFound`.
    pub fn with_code(code: ExitCode, data: T) -> Self {
        let label = if code.is_success() {
            "OK".to_string()
        } else {
            format!("{code:?}").to_uppercase()
        };
        Self {
            status: "success".to_string(),
            code: label,
            message: code.description().to_string(),
            data: Some(data),
            suggestions: Vec::new(),
            exit_code: code as u8,
        }
    }
}

impl JsonResponse<serde_json::Value> {
    /// Create an error response from EngineError.
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            status: "error".to_string(),
            code: error.status_code(),
            message: error.to_string(),
            data: None,
            suggestions: error
                .recovery_suggestions()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exit_code: ExitCode::from_error(error) as u8,
        }
    }
}
