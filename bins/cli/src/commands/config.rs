//! Config command handlers.

use crate::CliOutput;
use crate::commands::failure;
use crate::error::{CliError, ExitCode};
use crate::format::{ConfigFormat, OutputFormat};
use prcheck_config::{
    ValidatedSourceConfig, load_source_config_from_path, to_pretty_json, to_pretty_toml,
};
use std::path::Path;

/// Validate a source config file and print a short summary.
pub fn run_config_validate(format: OutputFormat, path: &Path) -> Result<CliOutput, CliError> {
    let config = match load_source_config_from_path(path) {
        Ok(config) => config,
        Err(error) => return Ok(failure(format, &error)),
    };

    let stdout = match format {
        OutputFormat::Json => format_summary_json(&config)?,
        OutputFormat::Text => format_summary_text(&config),
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

/// Print the normalized config. The access token is redacted.
pub fn run_config_show(
    format: OutputFormat,
    path: &Path,
    config_format: ConfigFormat,
) -> Result<CliOutput, CliError> {
    let rendered = load_source_config_from_path(path).and_then(|config| match config_format {
        ConfigFormat::Json => to_pretty_json(config.as_ref()),
        ConfigFormat::Toml => to_pretty_toml(config.as_ref()),
    });

    match rendered {
        Ok(stdout) => Ok(CliOutput {
            stdout,
            stderr: String::new(),
            exit_code: ExitCode::Ok,
        }),
        Err(error) => Ok(failure(format, &error)),
    }
}

fn format_summary_text(config: &ValidatedSourceConfig) -> String {
    let graphql = config
        .endpoints()
        .map(|endpoints| format!("graphql: {}\n", endpoints.v4))
        .unwrap_or_default();
    format!(
        "status: ok\nrepository: {}\n{graphql}paths: {}\nignore_paths: {}\n",
        config.repository(),
        config.paths.len(),
        config.ignore_paths.len()
    )
}

fn format_summary_json(config: &ValidatedSourceConfig) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "repository": config.repository().to_string(),
        "enterprise": config.endpoints().is_some(),
        "paths": config.paths.len(),
        "ignorePaths": config.ignore_paths.len(),
    });
    let mut output = serde_json::to_string(&payload)?;
    output.push('\n');
    Ok(output)
}
