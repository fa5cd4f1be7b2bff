//! Pull request snapshot builder.
//!
//! Defaults describe an ordinary open pull request: created well before it
//! was last updated, on `master`, not a fork, with a head commit whose
//! timestamps equal `updated_at`.

use chrono::{DateTime, TimeZone, Utc};
use prcheck_domain::{
    Commit, CommitId, IssueComment, PullRequest, PullRequestNumber, TimelineEvent,
    TimelineEventKind,
};

/// `2024-05-<day>T<hour>:00:00Z`.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Builder for [`PullRequest`] snapshots.
#[derive(Debug, Clone)]
pub struct PullRequestBuilder {
    snapshot: PullRequest,
}

impl PullRequestBuilder {
    /// Start a snapshot for `number`, last updated at `updated_at`.
    ///
    /// The head commit is `commit<number>`.
    pub fn new(number: u64, updated_at: DateTime<Utc>) -> Self {
        let created_at = Utc
            .with_ymd_and_hms(2024, 4, 1, 0, 0, 0)
            .single()
            .expect("valid fixture timestamp");
        let snapshot = PullRequest {
            number: PullRequestNumber::new(number).expect("non-zero fixture number"),
            node_id: format!("PR_{number}").into(),
            title: format!("pr{number} title").into(),
            url: format!("https://github.com/itsdalmo/test-repository/pull/{number}").into(),
            repository_url: "https://github.com/itsdalmo/test-repository".into(),
            base_ref_name: "master".into(),
            base_ref_oid: None,
            head_ref_name: format!("pr{number}").into(),
            is_cross_repository: false,
            created_at,
            updated_at,
            head_commit: Commit {
                id: CommitId::parse(format!("commit{number}")).expect("fixture commit id"),
                abbreviated_id: format!("c{number}").into(),
                authored_at: Some(updated_at),
                committed_at: Some(updated_at),
                pushed_at: None,
                message: format!("commit message{number}").into(),
                author: Some("testuser".into()),
            },
            events: Vec::new(),
            comments: Vec::new(),
            approved_review_count: 0,
            labels: Vec::new(),
            changed_files: None,
        };
        Self { snapshot }
    }

    /// Override the title.
    pub fn title(mut self, title: &str) -> Self {
        self.snapshot.title = title.into();
        self
    }

    /// Override the creation timestamp.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.snapshot.created_at = created_at;
        self
    }

    /// Replace the head commit id.
    pub fn commit(mut self, id: &str) -> Self {
        self.snapshot.head_commit.id = CommitId::parse(id).expect("fixture commit id");
        self
    }

    /// Set the head commit's authored and committed timestamps.
    pub fn committed_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.snapshot.head_commit.authored_at = Some(timestamp);
        self.snapshot.head_commit.committed_at = Some(timestamp);
        self
    }

    /// Override the head commit message.
    pub fn commit_message(mut self, message: &str) -> Self {
        self.snapshot.head_commit.message = message.into();
        self
    }

    /// Override the base branch.
    pub fn base_branch(mut self, name: &str) -> Self {
        self.snapshot.base_ref_name = name.into();
        self
    }

    /// Mark the pull request as opened from a fork.
    pub fn from_fork(mut self) -> Self {
        self.snapshot.is_cross_repository = true;
        self
    }

    /// Set the approving review count.
    pub fn approvals(mut self, count: u32) -> Self {
        self.snapshot.approved_review_count = count;
        self
    }

    /// Add a label.
    pub fn label(mut self, name: &str) -> Self {
        self.snapshot.labels.push(name.into());
        self
    }

    /// Append a timeline event.
    pub fn event(mut self, kind: TimelineEventKind, created_at: DateTime<Utc>) -> Self {
        self.snapshot.events.push(TimelineEvent { kind, created_at });
        self
    }

    /// Append a conversation comment and its timeline event.
    pub fn comment(mut self, body: &str, created_at: DateTime<Utc>) -> Self {
        self.snapshot.comments.push(IssueComment {
            body: body.into(),
            created_at,
        });
        self.event(TimelineEventKind::IssueComment, created_at)
    }

    /// Finish the snapshot.
    pub fn build(self) -> PullRequest {
        self.snapshot
    }
}
