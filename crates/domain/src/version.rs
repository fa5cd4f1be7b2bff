//! Reportable versions and the watermark derived from them.

use crate::primitives::{CommitId, PullRequestNumber};
use crate::pull_request::PullRequest;
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// How far back a cold start looks for open pull requests.
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 36;

/// One reportable pull request state.
///
/// Equality considers the pull request and commit only. Chronological order
/// is available through [`Version::cmp_updated`]; `Ord` is not implemented
/// because it would disagree with `Eq`.
///
/// ```
/// use prcheck_domain::Version;
///
/// let json = r#"{"pr":"7","commit":"abc","updated":"2024-05-01T10:00:00Z"}"#;
/// let version: Version = serde_json::from_str(json).unwrap();
/// assert_eq!(version.pr.get(), 7);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Pull request number, serialized as a string.
    pub pr: PullRequestNumber,
    /// Head commit id.
    pub commit: CommitId,
    /// Pull request last-updated timestamp.
    pub updated: DateTime<Utc>,
}

impl Version {
    /// Version describing the current state of a snapshot.
    #[must_use]
    pub fn of(pull_request: &PullRequest) -> Self {
        Self {
            pr: pull_request.number,
            commit: pull_request.head_commit.id.clone(),
            updated: pull_request.updated_at,
        }
    }

    /// Compare by last-updated timestamp, ascending.
    #[must_use]
    pub fn cmp_updated(&self, other: &Self) -> Ordering {
        self.updated.cmp(&other.updated)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.pr == other.pr && self.commit == other.commit
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pr.hash(state);
        self.commit.hash(state);
    }
}

/// Sort versions oldest first. Ties keep their input order.
pub fn sort_chronologically(versions: &mut [Version]) {
    versions.sort_by(Version::cmp_updated);
}

/// Timestamp of the newest version the caller already knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Watermark(Option<DateTime<Utc>>);

impl Watermark {
    /// No previous version: everything is new.
    pub const ABSENT: Self = Self(None);

    /// Watermark at an explicit timestamp.
    #[must_use]
    pub const fn at(timestamp: DateTime<Utc>) -> Self {
        Self(Some(timestamp))
    }

    /// Watermark carried by the caller's previous version.
    #[must_use]
    pub fn from_previous(previous: Option<&Version>) -> Self {
        Self(previous.map(|version| version.updated))
    }

    /// The underlying timestamp, if any.
    #[must_use]
    pub const fn timestamp(self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Returns true when no watermark was supplied.
    #[must_use]
    pub const fn is_absent(self) -> bool {
        self.0.is_none()
    }

    /// Returns true when `timestamp` is strictly newer than the watermark.
    /// An absent watermark admits every timestamp.
    #[must_use]
    pub fn admits(self, timestamp: DateTime<Utc>) -> bool {
        self.0.is_none_or(|watermark| timestamp > watermark)
    }

    /// Lower bound for the pull request query.
    ///
    /// Falls back to [`DEFAULT_LOOKBACK_MONTHS`] before `now` when absent.
    #[must_use]
    pub fn fetch_since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.0.unwrap_or_else(|| {
            now.checked_sub_months(Months::new(DEFAULT_LOOKBACK_MONTHS))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }
}
