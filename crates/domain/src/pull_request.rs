//! Pull request snapshots as fetched from the hosting service.

use crate::primitives::{CommitId, PullRequestNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The most recent commit on a pull request's head ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full object id.
    pub id: CommitId,
    /// Abbreviated object id, as displayed by the host.
    pub abbreviated_id: Box<str>,
    /// Author timestamp.
    pub authored_at: Option<DateTime<Utc>>,
    /// Committer timestamp.
    pub committed_at: Option<DateTime<Utc>>,
    /// Time the commit was pushed, when the host knows it.
    pub pushed_at: Option<DateTime<Utc>>,
    /// Full commit message.
    pub message: Box<str>,
    /// Author login, if the author maps to an account.
    pub author: Option<Box<str>>,
}

impl Commit {
    /// Latest of the authored, committed, and pushed timestamps.
    #[must_use]
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        [self.authored_at, self.committed_at, self.pushed_at]
            .into_iter()
            .flatten()
            .max()
    }
}

/// Closed vocabulary of timeline events the resolver reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineEventKind {
    /// The base branch of the pull request was changed.
    BaseRefChanged,
    /// The base branch was force pushed.
    BaseRefForcePushed,
    /// The head branch was force pushed.
    HeadRefForcePushed,
    /// The pull request was reopened.
    Reopened,
    /// A comment was posted on the pull request conversation.
    IssueComment,
}

impl TimelineEventKind {
    /// Stable lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseRefChanged => "base_ref_changed",
            Self::BaseRefForcePushed => "base_ref_force_pushed",
            Self::HeadRefForcePushed => "head_ref_force_pushed",
            Self::Reopened => "reopened",
            Self::IssueComment => "issue_comment",
        }
    }
}

/// One timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event type.
    pub kind: TimelineEventKind,
    /// When the event happened.
    pub created_at: DateTime<Utc>,
}

/// A comment on the pull request conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    /// Comment body.
    pub body: Box<str>,
    /// When the comment was posted.
    pub created_at: DateTime<Utc>,
}

/// Point-in-time state of one open pull request.
///
/// Snapshots are built once per resolution pass and never mutated; attaching
/// changed files produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Number within the repository.
    pub number: PullRequestNumber,
    /// Host node id.
    pub node_id: Box<str>,
    /// Title text.
    pub title: Box<str>,
    /// Browser URL of the pull request.
    pub url: Box<str>,
    /// Browser URL of the base repository.
    pub repository_url: Box<str>,
    /// Base branch name.
    pub base_ref_name: Box<str>,
    /// Base branch tip at fetch time.
    pub base_ref_oid: Option<CommitId>,
    /// Head branch name.
    pub head_ref_name: Box<str>,
    /// True when the head repository differs from the base repository.
    pub is_cross_repository: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-updated timestamp.
    pub updated_at: DateTime<Utc>,
    /// Most recent commit on the head ref.
    pub head_commit: Commit,
    /// Timeline events in chronological order.
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
    /// Conversation comments.
    #[serde(default)]
    pub comments: Vec<IssueComment>,
    /// Number of approving reviews.
    #[serde(default)]
    pub approved_review_count: u32,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<Box<str>>,
    /// Changed file paths, present only when path filters are configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<Vec<Box<str>>>,
}

impl PullRequest {
    /// Return a snapshot carrying the given changed files.
    #[must_use]
    pub fn with_changed_files(self, files: Vec<Box<str>>) -> Self {
        Self {
            changed_files: Some(files),
            ..self
        }
    }

    /// Events of one kind, in timeline order.
    pub fn events_of(&self, kind: TimelineEventKind) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter().filter(move |event| event.kind == kind)
    }

    /// Returns true when the pull request carries the given label.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|own| own.as_ref() == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::PrimitiveError;
    use chrono::TimeZone;

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).single()
    }

    #[test]
    fn latest_activity_skips_missing_timestamps() -> Result<(), PrimitiveError> {
        let commit = Commit {
            id: CommitId::parse("abc")?,
            abbreviated_id: "abc".into(),
            authored_at: at(3),
            committed_at: at(5),
            pushed_at: None,
            message: "msg".into(),
            author: None,
        };
        assert_eq!(commit.latest_activity(), at(5));

        let empty = Commit {
            authored_at: None,
            committed_at: None,
            ..commit
        };
        assert_eq!(empty.latest_activity(), None);
        Ok(())
    }

    #[test]
    fn event_kind_names_are_stable() {
        assert_eq!(TimelineEventKind::HeadRefForcePushed.as_str(), "head_ref_force_pushed");
        assert_eq!(TimelineEventKind::Reopened.as_str(), "reopened");
    }
}
