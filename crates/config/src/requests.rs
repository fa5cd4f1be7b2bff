//! Check request parsing.
//!
//! The orchestrator sends `{"source": {...}, "version": {...}}` on stdin. The
//! previous version is optional and several shapes mean "none": an absent
//! key, `null`, `{}`, or a version whose `pr` is empty or `"0"`.

use crate::schema::{SourceConfig, ValidatedSourceConfig};
use prcheck_domain::Version;
use prcheck_shared::{ErrorCode, ErrorEnvelope};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Check request payload (boundary DTO).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckRequestDto {
    /// Source block.
    pub source: Option<SourceConfig>,
    /// Previous version, in any of the accepted shapes.
    pub version: Option<Value>,
}

/// Validated check request.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    /// Validated source configuration.
    pub source: ValidatedSourceConfig,
    /// Newest version the orchestrator already knows.
    pub previous: Option<Version>,
}

/// Check request validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestParseError {
    /// The request has no `source` block.
    MissingSource,
    /// The previous version could not be decoded.
    InvalidVersion {
        /// Decoder message.
        reason: String,
    },
}

impl RequestParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingSource => ErrorCode::new("config", "missing_source"),
            Self::InvalidVersion { .. } => ErrorCode::new("config", "invalid_version"),
        }
    }
}

impl fmt::Display for RequestParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSource => formatter.write_str("check request has no source block"),
            Self::InvalidVersion { reason } => write!(formatter, "version is invalid: {reason}"),
        }
    }
}

impl std::error::Error for RequestParseError {}

impl From<RequestParseError> for ErrorEnvelope {
    fn from(error: RequestParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);
        match error {
            RequestParseError::MissingSource => envelope.with_metadata("field", "source"),
            RequestParseError::InvalidVersion { .. } => envelope.with_metadata("field", "version"),
        }
    }
}

/// Parse and validate a check request from JSON.
pub fn parse_check_request_json(input: &str) -> Result<CheckRequest, ErrorEnvelope> {
    let dto: CheckRequestDto = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid check request JSON: {error}"),
        )
        .with_metadata("request_kind", "check")
    })?;
    validate_check_request(dto)
}

/// Validate a decoded check request.
pub fn validate_check_request(dto: CheckRequestDto) -> Result<CheckRequest, ErrorEnvelope> {
    let source = dto
        .source
        .ok_or(RequestParseError::MissingSource)?
        .validate_and_normalize()?;
    let previous = dto.version.map(previous_version).transpose()?.flatten();
    Ok(CheckRequest { source, previous })
}

/// Decode a previous version, mapping the "no version" shapes to `None`.
pub fn previous_version(value: Value) -> Result<Option<Version>, RequestParseError> {
    let Value::Object(fields) = &value else {
        return match value {
            Value::Null => Ok(None),
            other => Err(RequestParseError::InvalidVersion {
                reason: format!("expected an object, got {other}"),
            }),
        };
    };

    let unset = match fields.get("pr") {
        None | Some(Value::Null) => true,
        Some(Value::String(pr)) => matches!(pr.trim(), "" | "0"),
        Some(Value::Number(pr)) => pr.as_u64() == Some(0),
        Some(_) => false,
    };
    if unset {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|error| RequestParseError::InvalidVersion {
            reason: error.to_string(),
        })
}
