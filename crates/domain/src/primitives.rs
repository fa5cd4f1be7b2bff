//! Domain primitives with validated constructors.

use prcheck_shared::{ErrorCode, ErrorEnvelope};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Pull request number is not a positive integer.
    InvalidPullRequestNumber {
        /// Raw input that failed to parse.
        input: String,
    },
    /// Repository is not of the form `owner/name`.
    MalformedRepository {
        /// Trimmed input that failed validation.
        input: String,
    },
    /// Commit id is empty after trimming.
    EmptyCommitId {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
}

impl PrimitiveError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidPullRequestNumber { .. } => {
                ErrorCode::new("domain", "invalid_pull_request_number")
            },
            Self::MalformedRepository { .. } => ErrorCode::new("config", "malformed_repository"),
            Self::EmptyCommitId { .. } => ErrorCode::new("domain", "invalid_commit_id"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPullRequestNumber { input } => {
                write!(formatter, "pull request number must be a positive integer: {input:?}")
            },
            Self::MalformedRepository { input } => {
                write!(formatter, "malformed repository {input:?}, expected owner/name")
            },
            Self::EmptyCommitId { .. } => formatter.write_str("commit id must be non-empty"),
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            PrimitiveError::InvalidPullRequestNumber { input }
            | PrimitiveError::MalformedRepository { input } => {
                envelope.with_metadata("input", input)
            },
            PrimitiveError::EmptyCommitId { input_length } => {
                envelope.with_metadata("input_length", input_length.to_string())
            },
        }
    }
}

/// Pull request number within a repository.
///
/// Serialized as a JSON string for compatibility with CI orchestrators that
/// store version fields as strings. Deserialization accepts a string or a
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Wrap a positive pull request number.
    pub fn new(value: u64) -> Result<Self, PrimitiveError> {
        if value == 0 {
            return Err(PrimitiveError::InvalidPullRequestNumber {
                input: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Parse a pull request number from its decimal string form.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        raw.trim()
            .parse::<u64>()
            .ok()
            .and_then(|value| Self::new(value).ok())
            .ok_or_else(|| PrimitiveError::InvalidPullRequestNumber {
                input: raw.to_owned(),
            })
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl Serialize for PullRequestNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PullRequestNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumberVisitor;

        impl Visitor<'_> for NumberVisitor {
            type Value = PullRequestNumber;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a positive pull request number as a string or integer")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                PullRequestNumber::new(value).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u64::try_from(value)
                    .map_err(E::custom)
                    .and_then(|value| self.visit_u64(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                PullRequestNumber::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

/// Repository coordinates on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySlug {
    owner: Box<str>,
    name: Box<str>,
}

impl RepositorySlug {
    /// Parse `owner/name`. Exactly two non-empty segments are required.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let trimmed = input.as_ref().trim();
        let malformed = || PrimitiveError::MalformedRepository {
            input: trimmed.to_owned(),
        };

        let mut parts = trimmed.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        if owner.trim().is_empty() || name.trim().is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            owner: owner.trim().into(),
            name: name.trim().into(),
        })
    }

    /// Repository owner (user or organisation).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.owner, self.name)
    }
}

impl Serialize for RepositorySlug {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RepositorySlug {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(de::Error::custom)
    }
}

/// Git commit object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(Box<str>);

impl CommitId {
    /// Parse a commit id. The value is trimmed; empty values are rejected.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PrimitiveError::EmptyCommitId {
                input_length: raw.len(),
            });
        }
        Ok(Self(trimmed.into()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
