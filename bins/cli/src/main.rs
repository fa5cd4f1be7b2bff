//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{run_check, run_config_show, run_config_validate};
use error::{CliError, ExitCode};
use format::{ConfigFormat, OutputArgs};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "prcheck",
    version,
    about = "Resolve new pull request versions for a CI check resource",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read a check request and print the versions to report.
    Check {
        /// Read the request from a file instead of stdin.
        #[arg(long)]
        request: Option<PathBuf>,
    },
    /// Source config commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate a source config file (JSON or TOML).
    Validate {
        /// Config file path.
        path: PathBuf,
    },
    /// Print the normalized source config.
    Show {
        /// Config file path.
        path: PathBuf,
        /// Serialization for the printed config.
        #[arg(long, value_enum, default_value_t)]
        format: ConfigFormat,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(cli: &Cli) -> Result<CliOutput, CliError> {
    let format = cli.output.output;
    match &cli.command {
        Commands::Check { request } => run_check(format, request.as_deref()),
        Commands::Config { command } => match command {
            ConfigCommands::Validate { path } => run_config_validate(format, path),
            ConfigCommands::Show {
                path,
                format: config_format,
            } => run_config_show(format, path, *config_format),
        },
    }
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_config_show_with_toml() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "prcheck",
            "--output",
            "json",
            "config",
            "show",
            "source.json",
            "--format",
            "toml",
        ])?;

        assert_eq!(cli.output.output, format::OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show {
                    format: ConfigFormat::Toml,
                    ..
                }
            }
        ));
        Ok(())
    }
}
