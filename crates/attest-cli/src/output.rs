//! Output formatting for table, JSON and quiet modes.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::{Deserialize, Serialize};

use crate::ExitCode;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for scripting
    Json,
    /// Quiet mode - minimal output, rely on exit codes
    Quiet,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "quiet" | "q" => Ok(OutputFormat::Quiet),
            _ => Err(format!("Unknown output format: {s}. Valid options: table, json, quiet")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Quiet => write!(f, "quiet"),
        }
    }
}

/// Consistent JSON response wrapper for all commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Error body of a failed [`JsonResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Taxonomy name, e.g. `AuthenticationError`
    pub kind: String,
    pub message: String,
    pub exit_code: i32,
    pub exit_code_name: String,
}

impl<T: Serialize> JsonResponse<T> {
    /// Create a successful response with command context
    pub fn success_with_command(data: T, command: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

impl JsonResponse<()> {
    /// Create an error response with command context
    pub fn error_with_command(detail: ErrorDetail, command: &str) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(detail),
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

/// Command results that can be shown as a two-column table.
pub trait Report: Serialize {
    fn rows(&self) -> Vec<(&'static str, String)>;
}

/// Formats output for different modes
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    format: OutputFormat,
    verbose: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a command result. Quiet mode renders nothing.
    pub fn render<T: Report>(&self, data: &T, command: &str) -> String {
        match self.format {
            OutputFormat::Table => Self::table(&data.rows()),
            OutputFormat::Json => to_json(&JsonResponse::success_with_command(data, command)),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Render a failure with its taxonomy name and exit code.
    pub fn render_error(&self, command: &str, kind: &str, message: &str, code: ExitCode) -> String {
        match self.format {
            OutputFormat::Table => format!("Error [{kind}]: {message}"),
            OutputFormat::Json => {
                let detail = ErrorDetail {
                    kind: kind.to_string(),
                    message: message.to_string(),
                    exit_code: code.into(),
                    exit_code_name: code.name().to_string(),
                };
                to_json(&JsonResponse::error_with_command(detail, command))
            }
            OutputFormat::Quiet => String::new(),
        }
    }

    pub fn emit<T: Report>(&self, data: &T, command: &str) {
        let out = self.render(data, command);
        if !out.is_empty() {
            println!("{out}");
        }
    }

    /// Table errors go to stderr; JSON errors go to stdout so scripts can
    /// parse a single stream.
    pub fn emit_error(&self, command: &str, kind: &str, message: &str, code: ExitCode) {
        let out = self.render_error(command, kind, message, code);
        match self.format {
            OutputFormat::Table => eprintln!("{out}"),
            OutputFormat::Json => println!("{out}"),
            OutputFormat::Quiet => {}
        }
    }

    /// Progress message, only shown in verbose table mode.
    pub fn progress(&self, message: &str) {
        if self.verbose && self.format == OutputFormat::Table {
            eprintln!("... {message}");
        }
    }

    fn table(rows: &[(&'static str, String)]) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Field", "Value"]);
        for (field, value) in rows {
            table.add_row(vec![Cell::new(field), Cell::new(value)]);
        }
        table.to_string()
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
