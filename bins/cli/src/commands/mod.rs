//! CLI command handlers.

pub mod check;
pub mod config;

pub use check::run_check;
pub use config::{run_config_show, run_config_validate};

use crate::CliOutput;
use crate::error::ExitCode;
use crate::format::{OutputFormat, format_error};
use prcheck_shared::ErrorEnvelope;

/// Output for a command that failed with a structured error.
pub(crate) fn failure(format: OutputFormat, error: &ErrorEnvelope) -> CliOutput {
    CliOutput {
        stdout: String::new(),
        stderr: format_error(format, error),
        exit_code: ExitCode::for_envelope(error),
    }
}
