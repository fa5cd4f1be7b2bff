//! # prcheck-config
//!
//! Source configuration schema, check request parsing, and environment
//! overrides for the resource binary.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing.
pub mod env;
/// Config file loading helpers.
pub mod load;
/// Check request parsing and validation.
pub mod requests;
/// Source configuration schema types and helpers.
pub mod schema;

pub use env::{
    BuildMetadata, DEFAULT_HTTP_TIMEOUT_MS, ENV_ATC_EXTERNAL_URL, ENV_BUILD_JOB_NAME,
    ENV_BUILD_PIPELINE_NAME, ENV_BUILD_TEAM_NAME, ENV_HTTP_TIMEOUT_MS, ENV_LOG_FORMAT,
    ENV_LOG_LEVEL, EnvParseError, LogFormat, ResourceEnv,
};
pub use load::{load_source_config_from_path, to_pretty_json, to_pretty_toml};
pub use requests::{
    CheckRequest, CheckRequestDto, RequestParseError, parse_check_request_json, previous_version,
    validate_check_request,
};
pub use schema::{
    ConfigSchemaError, EnterpriseEndpoints, SourceConfig, ValidatedSourceConfig,
    parse_source_config_json, parse_source_config_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
