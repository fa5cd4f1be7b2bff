//! Source configuration schema and validation.
//!
//! The source block is shared by the `check`, `in` and `out` scripts of the
//! resource, so keys this crate does not know about are accepted and ignored.

use prcheck_domain::{FilterPolicy, PrimitiveError, RepositorySlug};
use prcheck_shared::{ErrorCode, ErrorEnvelope, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

fn sanitize_url_for_error(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() || !parsed.username().is_empty() {
                // Clear credentials before logging.
                if parsed.set_username("").is_err() {
                    return "[invalid url: invalid username]".to_string();
                }
                if parsed.set_password(None).is_err() {
                    return "[invalid url: invalid password]".to_string();
                }
            }
            parsed.to_string()
        },
        Err(error) => format!("[invalid url: {error}]"),
    }
}

/// Source configuration as written by the pipeline author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SourceConfig {
    /// Repository in `owner/name` form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// GitHub access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<SecretString>,
    /// GitHub Enterprise REST endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v3_endpoint: Option<String>,
    /// GitHub Enterprise GraphQL endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v4_endpoint: Option<String>,
    /// Only report pull requests touching these globs.
    pub paths: Vec<String>,
    /// Skip pull requests touching only these globs.
    pub ignore_paths: Vec<String>,
    /// Ignore `[skip ci]` directives.
    pub disable_ci_skip: bool,
    /// Accept invalid TLS certificates.
    pub skip_ssl_verification: bool,
    /// Skip pull requests opened from forks.
    pub disable_forks: bool,
    /// Only report pull requests targeting this branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    /// Send the GraphQL preview `Accept` header.
    pub preview_schema: bool,
    /// Minimum approving review count.
    pub required_review_approvals: u32,
    /// Only report pull requests carrying one of these labels.
    pub labels: Vec<String>,
}

/// GitHub Enterprise endpoints. Both are required together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnterpriseEndpoints {
    /// REST v3 base URL.
    pub v3: Url,
    /// GraphQL v4 URL.
    pub v4: Url,
}

impl SourceConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedSourceConfig, ConfigSchemaError> {
        let repository = match self.repository.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ConfigSchemaError::MissingField {
                    field: "repository",
                });
            },
            Some(value) => RepositorySlug::parse(value)?,
        };

        let access_token = match self.access_token.as_ref() {
            Some(token) if !token.is_blank() => SecretString::new(token.expose().trim()),
            _ => {
                return Err(ConfigSchemaError::MissingField {
                    field: "access_token",
                });
            },
        };

        self.repository = Some(repository.to_string());
        self.v3_endpoint = normalize_optional(self.v3_endpoint.take());
        self.v4_endpoint = normalize_optional(self.v4_endpoint.take());
        self.base_branch = normalize_optional(self.base_branch.take());
        self.paths = normalize_list(std::mem::take(&mut self.paths));
        self.ignore_paths = normalize_list(std::mem::take(&mut self.ignore_paths));
        self.labels = normalize_list(std::mem::take(&mut self.labels));

        let endpoints = match (self.v3_endpoint.as_deref(), self.v4_endpoint.as_deref()) {
            (None, None) => None,
            (Some(v3), Some(v4)) => Some(EnterpriseEndpoints {
                v3: validate_url("v3_endpoint", v3)?,
                v4: validate_url("v4_endpoint", v4)?,
            }),
            (Some(_), None) => {
                return Err(ConfigSchemaError::EnterpriseEndpointsIncomplete {
                    missing: "v4_endpoint",
                });
            },
            (None, Some(_)) => {
                return Err(ConfigSchemaError::EnterpriseEndpointsIncomplete {
                    missing: "v3_endpoint",
                });
            },
        };

        Ok(ValidatedSourceConfig {
            raw: self,
            repository,
            access_token,
            endpoints,
        })
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

// Order matters: gitignore negations apply to earlier patterns.
fn normalize_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

fn validate_url(field: &'static str, value: &str) -> Result<Url, ConfigSchemaError> {
    let invalid = |reason: &'static str| ConfigSchemaError::InvalidUrl {
        field,
        value: sanitize_url_for_error(value),
        reason,
    };
    let parsed = Url::parse(value).map_err(|_| invalid("not an absolute URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(parsed)
}

/// Validated config wrapper carrying parsed identifiers.
#[derive(Debug, Clone)]
pub struct ValidatedSourceConfig {
    raw: SourceConfig,
    repository: RepositorySlug,
    access_token: SecretString,
    endpoints: Option<EnterpriseEndpoints>,
}

impl ValidatedSourceConfig {
    /// Repository to watch.
    #[must_use]
    pub const fn repository(&self) -> &RepositorySlug {
        &self.repository
    }

    /// Access token for the GitHub API.
    #[must_use]
    pub const fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    /// Enterprise endpoints, when configured.
    #[must_use]
    pub const fn endpoints(&self) -> Option<&EnterpriseEndpoints> {
        self.endpoints.as_ref()
    }

    /// Predicate inputs for the check use case.
    #[must_use]
    pub fn policy(&self) -> FilterPolicy {
        let boxed = |values: &[String]| -> Vec<Box<str>> {
            values.iter().map(|value| value.as_str().into()).collect()
        };
        FilterPolicy {
            paths: boxed(&self.raw.paths),
            ignore_paths: boxed(&self.raw.ignore_paths),
            disable_ci_skip: self.raw.disable_ci_skip,
            base_branch: self.raw.base_branch.as_deref().map(Into::into),
            disable_forks: self.raw.disable_forks,
            required_review_approvals: self.raw.required_review_approvals,
            labels: boxed(&self.raw.labels),
        }
    }

    /// Borrow the normalized config.
    #[must_use]
    pub const fn as_ref(&self) -> &SourceConfig {
        &self.raw
    }
}

impl AsRef<SourceConfig> for ValidatedSourceConfig {
    fn as_ref(&self) -> &SourceConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedSourceConfig {
    type Target = SourceConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Parse a source config from a JSON string, applying validation and normalization.
pub fn parse_source_config_json(input: &str) -> Result<ValidatedSourceConfig, ErrorEnvelope> {
    let config: SourceConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid source JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a source config from a TOML string, applying validation and normalization.
pub fn parse_source_config_toml(input: &str) -> Result<ValidatedSourceConfig, ErrorEnvelope> {
    let config: SourceConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid source TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Source configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// A required field is absent or blank.
    MissingField {
        /// Field name in the source block.
        field: &'static str,
    },
    /// `repository` is not `owner/name`.
    MalformedRepository {
        /// Raw input.
        input: String,
    },
    /// Only one of the enterprise endpoints is set.
    EnterpriseEndpointsIncomplete {
        /// The endpoint that is missing.
        missing: &'static str,
    },
    /// A URL entry is invalid.
    InvalidUrl {
        /// Field name in the source block.
        field: &'static str,
        /// Sanitized value.
        value: String,
        /// Short reason describing why validation failed.
        reason: &'static str,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::new("config", "missing_field"),
            Self::MalformedRepository { .. } => ErrorCode::new("config", "malformed_repository"),
            Self::EnterpriseEndpointsIncomplete { .. } => {
                ErrorCode::new("config", "enterprise_endpoints_incomplete")
            },
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(formatter, "{field} is required"),
            Self::MalformedRepository { input } => {
                write!(formatter, "repository must be owner/name, got {input:?}")
            },
            Self::EnterpriseEndpointsIncomplete { missing } => write!(
                formatter,
                "both v3_endpoint and v4_endpoint are required for GitHub Enterprise ({missing} is missing)"
            ),
            Self::InvalidUrl { field, reason, .. } => {
                write!(formatter, "{field} is not a valid URL: {reason}")
            },
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<PrimitiveError> for ConfigSchemaError {
    fn from(error: PrimitiveError) -> Self {
        match error {
            PrimitiveError::MalformedRepository { input } => Self::MalformedRepository { input },
            other => Self::MalformedRepository {
                input: other.to_string(),
            },
        }
    }
}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::MissingField { field } => envelope.with_metadata("field", field),
            ConfigSchemaError::MalformedRepository { input } => envelope
                .with_metadata("field", "repository")
                .with_metadata("input", input),
            ConfigSchemaError::EnterpriseEndpointsIncomplete { missing } => {
                envelope.with_metadata("field", missing)
            },
            ConfigSchemaError::InvalidUrl { field, value, .. } => envelope
                .with_metadata("field", field)
                .with_metadata("value", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn minimal() -> SourceConfig {
        SourceConfig {
            repository: Some("itsdalmo/test-repository".to_owned()),
            access_token: Some(SecretString::from("oauthtoken")),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn accepts_minimal_source() -> Result<(), Box<dyn Error>> {
        let validated = minimal().validate_and_normalize()?;
        assert_eq!(validated.repository().owner(), "itsdalmo");
        assert_eq!(validated.repository().name(), "test-repository");
        assert_eq!(validated.access_token().expose(), "oauthtoken");
        assert!(validated.endpoints().is_none());
        assert_eq!(validated.policy(), FilterPolicy::default());
        Ok(())
    }

    #[test]
    fn rejects_missing_required_fields() {
        let missing_repo = SourceConfig {
            repository: None,
            ..minimal()
        };
        assert_eq!(
            missing_repo.validate_and_normalize().err(),
            Some(ConfigSchemaError::MissingField {
                field: "repository"
            })
        );

        let blank_token = SourceConfig {
            access_token: Some(SecretString::from("  ")),
            ..minimal()
        };
        assert_eq!(
            blank_token.validate_and_normalize().err(),
            Some(ConfigSchemaError::MissingField {
                field: "access_token"
            })
        );
    }

    #[test]
    fn rejects_malformed_repository() {
        let config = SourceConfig {
            repository: Some("just-a-name".to_owned()),
            ..minimal()
        };
        let error = config.validate_and_normalize().err();
        assert!(matches!(
            error,
            Some(ConfigSchemaError::MalformedRepository { ref input }) if input == "just-a-name"
        ));
    }

    #[test]
    fn enterprise_endpoints_come_in_pairs() -> Result<(), Box<dyn Error>> {
        let only_v3 = SourceConfig {
            v3_endpoint: Some("https://ghe.example.com/api/v3".to_owned()),
            ..minimal()
        };
        assert_eq!(
            only_v3.validate_and_normalize().err(),
            Some(ConfigSchemaError::EnterpriseEndpointsIncomplete {
                missing: "v4_endpoint"
            })
        );

        let both = SourceConfig {
            v3_endpoint: Some("https://ghe.example.com/api/v3".to_owned()),
            v4_endpoint: Some(" https://ghe.example.com/api/graphql ".to_owned()),
            ..minimal()
        };
        let validated = both.validate_and_normalize()?;
        let endpoints = validated.endpoints().ok_or("missing endpoints")?;
        assert_eq!(endpoints.v4.path(), "/api/graphql");
        Ok(())
    }

    #[test]
    fn invalid_url_error_strips_credentials() -> Result<(), ErrorEnvelope> {
        let config = SourceConfig {
            v3_endpoint: Some("ftp://user:pw@ghe.example.com/api/v3".to_owned()),
            v4_endpoint: Some("https://ghe.example.com/api/graphql".to_owned()),
            ..minimal()
        };
        let Err(error) = config.validate_and_normalize() else {
            return Err(ErrorEnvelope::expected(ErrorCode::internal(), "expected an error"));
        };
        let envelope = ErrorEnvelope::from(error);
        assert_eq!(envelope.code, ErrorCode::new("config", "invalid_url"));
        let value = envelope.metadata.get("value").cloned().unwrap_or_default();
        assert!(!value.contains("pw"));
        Ok(())
    }

    #[test]
    fn policy_trims_and_keeps_order() -> Result<(), Box<dyn Error>> {
        let config = SourceConfig {
            paths: vec![" src/** ".to_owned(), String::new(), "!src/vendor/".to_owned()],
            ignore_paths: vec!["*.md".to_owned()],
            labels: vec![" enhancement ".to_owned(), " ".to_owned()],
            base_branch: Some(" ".to_owned()),
            required_review_approvals: 2,
            disable_forks: true,
            ..minimal()
        };
        let policy = config.validate_and_normalize()?.policy();
        assert_eq!(
            policy.paths,
            vec![Box::<str>::from("src/**"), Box::<str>::from("!src/vendor/")]
        );
        assert_eq!(policy.ignore_paths, vec![Box::<str>::from("*.md")]);
        assert_eq!(policy.labels, vec![Box::<str>::from("enhancement")]);
        assert_eq!(policy.base_branch, None);
        assert_eq!(policy.required_review_approvals, 2);
        assert!(policy.disable_forks);
        Ok(())
    }

    #[test]
    fn serialized_config_redacts_token() -> Result<(), Box<dyn Error>> {
        let validated = minimal().validate_and_normalize()?;
        let json = serde_json::to_string(validated.as_ref())?;
        assert!(!json.contains("oauthtoken"));
        assert!(!format!("{validated:?}").contains("oauthtoken"));
        Ok(())
    }
}
