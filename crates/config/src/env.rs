//! Environment variable parsing.
//!
//! Parsing works on a key/value map so tests never touch the process
//! environment. [`ResourceEnv::from_std_env`] snapshots only the variables
//! this crate knows about.

use prcheck_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Minimum log level (`debug`, `info`, `warn`, `error`).
pub const ENV_LOG_LEVEL: &str = "PRCHECK_LOG_LEVEL";
/// Log output format (`text` or `json`).
pub const ENV_LOG_FORMAT: &str = "PRCHECK_LOG_FORMAT";
/// Per-request HTTP timeout for the GitHub client.
pub const ENV_HTTP_TIMEOUT_MS: &str = "PRCHECK_HTTP_TIMEOUT_MS";
/// Pipeline name set by the orchestrator.
pub const ENV_BUILD_PIPELINE_NAME: &str = "BUILD_PIPELINE_NAME";
/// Team name set by the orchestrator.
pub const ENV_BUILD_TEAM_NAME: &str = "BUILD_TEAM_NAME";
/// Job name set by the orchestrator.
pub const ENV_BUILD_JOB_NAME: &str = "BUILD_JOB_NAME";
/// External URL of the orchestrator.
pub const ENV_ATC_EXTERNAL_URL: &str = "ATC_EXTERNAL_URL";

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

const HTTP_TIMEOUT_MIN_MS: u64 = 1_000;
const HTTP_TIMEOUT_MAX_MS: u64 = 600_000;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Orchestrator metadata attached to every log event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Pipeline name.
    pub pipeline: Option<Box<str>>,
    /// Team name.
    pub team: Option<Box<str>>,
    /// Job name.
    pub job: Option<Box<str>>,
    /// Orchestrator URL.
    pub external_url: Option<Box<str>>,
}

impl BuildMetadata {
    /// Present entries as log base fields.
    #[must_use]
    pub fn log_fields(&self) -> BTreeMap<&'static str, Box<str>> {
        [
            ("pipeline", &self.pipeline),
            ("team", &self.team),
            ("job", &self.job),
            ("atc_external_url", &self.external_url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|value| (key, value)))
        .collect()
    }
}

/// Environment overrides for the resource binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceEnv {
    /// Minimum log level name.
    pub log_level: Option<Box<str>>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// HTTP timeout in milliseconds.
    pub http_timeout_ms: Option<u64>,
    /// Orchestrator metadata.
    pub build: BuildMetadata,
}

impl ResourceEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            log_level: parse_optional_log_level(map, ENV_LOG_LEVEL)?,
            log_format: parse_optional_log_format(map, ENV_LOG_FORMAT)?,
            http_timeout_ms: parse_optional_timeout(map, ENV_HTTP_TIMEOUT_MS)?,
            build: BuildMetadata {
                pipeline: parse_optional_trimmed_string(map, ENV_BUILD_PIPELINE_NAME),
                team: parse_optional_trimmed_string(map, ENV_BUILD_TEAM_NAME),
                job: parse_optional_trimmed_string(map, ENV_BUILD_JOB_NAME),
                external_url: parse_optional_url_string(map, ENV_ATC_EXTERNAL_URL)?,
            },
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in [
            ENV_LOG_LEVEL,
            ENV_LOG_FORMAT,
            ENV_HTTP_TIMEOUT_MS,
            ENV_BUILD_PIPELINE_NAME,
            ENV_BUILD_TEAM_NAME,
            ENV_BUILD_JOB_NAME,
            ENV_ATC_EXTERNAL_URL,
        ] {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_owned(), value);
            }
        }
        Self::from_map(&map)
    }

    /// Effective HTTP timeout.
    #[must_use]
    pub fn http_timeout_ms(&self) -> u64 {
        self.http_timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)
    }
}

// Orchestrator-provided metadata is informational; blank values are skipped.
fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Option<Box<str>> {
    map.get(var)
        .map(|raw| raw.trim())
        .filter(|trimmed| !trimmed.is_empty())
        .map(Into::into)
}

fn parse_optional_log_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    if !LOG_LEVELS.contains(&trimmed.as_str()) {
        return Err(EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        });
    }
    Ok(Some(trimmed.into_boxed_str()))
}

fn parse_optional_log_format(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<LogFormat>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    LogFormat::parse(trimmed)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_timeout(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    let value = trimmed
        .parse::<u64>()
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })?;
    if !(HTTP_TIMEOUT_MIN_MS..=HTTP_TIMEOUT_MAX_MS).contains(&value) {
        return Err(EnvParseError::OutOfRange {
            var,
            value,
            min: HTTP_TIMEOUT_MIN_MS,
            max: HTTP_TIMEOUT_MAX_MS,
        });
    }
    Ok(Some(value))
}

fn parse_optional_url_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parsed = Url::parse(trimmed).map_err(|_| EnvParseError::InvalidUrl {
        var,
        value: raw.clone(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(EnvParseError::InvalidUrl {
            var,
            value: raw.clone(),
        });
    }

    Ok(Some(trimmed.into()))
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var is outside its bounds.
    OutOfRange {
        /// Env var name.
        var: &'static str,
        /// Parsed value.
        value: u64,
        /// Inclusive minimum.
        min: u64,
        /// Inclusive maximum.
        max: u64,
    },
    /// URL env var had an invalid value.
    InvalidUrl {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::OutOfRange { .. } => ErrorCode::new("config", "env_out_of_range"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_env_url"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::OutOfRange { var, min, max, .. } => {
                write!(formatter, "{var} must be between {min} and {max}")
            },
            Self::InvalidUrl { var, .. } => write!(formatter, "{var} must be a valid URL"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => envelope.with_metadata("env_var", var),
            EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidUrl { var, value }
            | EnvParseError::InvalidEnum { var, value } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", redact_if_secret(var, &value)),
            EnvParseError::OutOfRange {
                var,
                value,
                min,
                max,
            } => envelope
                .with_metadata("env_var", var)
                .with_metadata("value", value.to_string())
                .with_metadata("min", min.to_string())
                .with_metadata("max", max.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn empty_map_uses_defaults() -> Result<(), EnvParseError> {
        let env = ResourceEnv::from_map(&BTreeMap::new())?;
        assert_eq!(env, ResourceEnv::default());
        assert_eq!(env.http_timeout_ms(), DEFAULT_HTTP_TIMEOUT_MS);
        assert!(env.build.log_fields().is_empty());
        Ok(())
    }

    #[test]
    fn parses_known_variables() -> Result<(), EnvParseError> {
        let env = ResourceEnv::from_map(&map(&[
            (ENV_LOG_LEVEL, " DEBUG "),
            (ENV_LOG_FORMAT, "json"),
            (ENV_HTTP_TIMEOUT_MS, "5000"),
            (ENV_BUILD_PIPELINE_NAME, "infra"),
            (ENV_BUILD_JOB_NAME, "  "),
            (ENV_ATC_EXTERNAL_URL, "https://ci.example.com"),
        ]))?;
        assert_eq!(env.log_level.as_deref(), Some("debug"));
        assert_eq!(env.log_format, Some(LogFormat::Json));
        assert_eq!(env.http_timeout_ms(), 5_000);

        let fields = env.build.log_fields();
        assert_eq!(fields.get("pipeline").map(AsRef::as_ref), Some("infra"));
        assert!(!fields.contains_key("job"));
        assert_eq!(
            fields.get("atc_external_url").map(AsRef::as_ref),
            Some("https://ci.example.com")
        );
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            ResourceEnv::from_map(&map(&[(ENV_LOG_LEVEL, "loud")])),
            Err(EnvParseError::InvalidEnum {
                var: ENV_LOG_LEVEL,
                value: "loud".to_owned(),
            })
        );
        assert_eq!(
            ResourceEnv::from_map(&map(&[(ENV_HTTP_TIMEOUT_MS, "")])),
            Err(EnvParseError::EmptyValue {
                var: ENV_HTTP_TIMEOUT_MS
            })
        );
        assert!(matches!(
            ResourceEnv::from_map(&map(&[(ENV_HTTP_TIMEOUT_MS, "10")])),
            Err(EnvParseError::OutOfRange { value: 10, .. })
        ));
        assert!(matches!(
            ResourceEnv::from_map(&map(&[(ENV_ATC_EXTERNAL_URL, "ftp://ci")])),
            Err(EnvParseError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn errors_map_to_config_envelopes() {
        let envelope = ErrorEnvelope::from(EnvParseError::InvalidInt {
            var: ENV_HTTP_TIMEOUT_MS,
            value: "soon".to_owned(),
        });
        assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_int"));
        assert_eq!(envelope.metadata.get("value"), Some(&"soon".to_owned()));
    }
}
