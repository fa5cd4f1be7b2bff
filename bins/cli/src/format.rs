//! Output format helpers for CLI commands.

use clap::{Args, ValueEnum};
use prcheck_shared::{ErrorEnvelope, redact_if_secret};
use serde_json::{Map, Value, json};

/// Output format for diagnostics and command summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    #[default]
    Text,
    /// Machine-friendly JSON output.
    Json,
}

/// Serialization used by `config show`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// TOML.
    Toml,
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for summaries and errors.
    #[arg(long, global = true, value_enum, default_value_t)]
    pub output: OutputFormat,
}

/// Render an error for stderr. Metadata values under secret-looking keys are
/// redacted.
#[must_use]
pub fn format_error(format: OutputFormat, error: &ErrorEnvelope) -> String {
    match format {
        OutputFormat::Json => {
            let metadata: Map<String, Value> = error
                .metadata
                .iter()
                .map(|(key, value)| (key.clone(), Value::from(redact_if_secret(key, value))))
                .collect();
            let payload = json!({
                "status": "error",
                "error": {
                    "code": error.code.to_string(),
                    "message": error.message,
                    "kind": error.kind.to_string(),
                    "class": error.class.to_string(),
                    "metadata": metadata,
                }
            });
            let mut output = serde_json::to_string(&payload).unwrap_or_else(|_| {
                "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\"}}"
                    .to_owned()
            });
            output.push('\n');
            output
        },
        OutputFormat::Text => {
            let mut output = format!("error: {}: {}\n", error.code, error.message);
            for (key, value) in &error.metadata {
                output.push_str("  ");
                output.push_str(key);
                output.push_str(": ");
                output.push_str(&redact_if_secret(key, value));
                output.push('\n');
            }
            output
        },
    }
}
