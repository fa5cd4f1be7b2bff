//! Filter predicates deciding whether a snapshot is a new version.
//!
//! Exclusionary rules run first, in [`ExclusionRule::ORDERED`] order, and the
//! first one that fires removes the snapshot. Inclusionary rules then run in
//! [`InclusionRule::ORDERED`] order and the first one that fires makes the
//! snapshot a candidate. Both passes short-circuit. Every evaluated rule is
//! reported to an observer so callers can trace decisions without the
//! predicates doing any I/O.

use crate::pull_request::{PullRequest, TimelineEventKind};
use crate::version::Watermark;
use regex::Regex;
use std::sync::LazyLock;

static SKIP_CI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\[(ci skip|skip ci)\]").ok());
static BUILD_CI: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\[(ci build|build ci)\]").ok());

/// Predicate inputs taken from the source configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Include globs for changed files.
    pub paths: Vec<Box<str>>,
    /// Exclude globs for changed files.
    pub ignore_paths: Vec<Box<str>>,
    /// Ignore `[skip ci]` directives.
    pub disable_ci_skip: bool,
    /// Required base branch.
    pub base_branch: Option<Box<str>>,
    /// Exclude pull requests from forks.
    pub disable_forks: bool,
    /// Minimum approving review count.
    pub required_review_approvals: u32,
    /// Required labels; any one of them suffices.
    pub labels: Vec<Box<str>>,
}

impl FilterPolicy {
    /// Returns true when changed files must be fetched and matched.
    #[must_use]
    pub fn has_path_filters(&self) -> bool {
        !self.paths.is_empty() || !self.ignore_paths.is_empty()
    }
}

/// True when `text` contains a `[skip ci]` or `[ci skip]` directive.
#[must_use]
pub fn contains_skip_ci(text: &str) -> bool {
    SKIP_CI.as_ref().is_some_and(|pattern| pattern.is_match(text))
}

/// True when `text` contains a `[build ci]` or `[ci build]` directive.
#[must_use]
pub fn contains_build_ci(text: &str) -> bool {
    BUILD_CI.as_ref().is_some_and(|pattern| pattern.is_match(text))
}

/// Title or head commit message asks CI to skip the pull request.
#[must_use]
pub fn skip_ci(disabled: bool, pull_request: &PullRequest) -> bool {
    !disabled
        && (contains_skip_ci(&pull_request.title)
            || contains_skip_ci(&pull_request.head_commit.message))
}

/// A base branch is required and the pull request targets another one.
#[must_use]
pub fn base_branch_mismatch(required: Option<&str>, pull_request: &PullRequest) -> bool {
    required.is_some_and(|branch| branch != pull_request.base_ref_name.as_ref())
}

/// Fewer approving reviews than required.
#[must_use]
pub const fn insufficient_approvals(required: u32, pull_request: &PullRequest) -> bool {
    pull_request.approved_review_count < required
}

/// Labels are required and the pull request carries none of them.
#[must_use]
pub fn missing_required_label(required: &[Box<str>], pull_request: &PullRequest) -> bool {
    !required.is_empty() && !required.iter().any(|label| pull_request.has_label(label))
}

/// Forks are disabled and the pull request comes from one.
#[must_use]
pub const fn forked(disabled: bool, pull_request: &PullRequest) -> bool {
    disabled && pull_request.is_cross_repository
}

/// Never updated, or created after anything the caller has seen.
#[must_use]
pub fn freshly_created(watermark: Watermark, pull_request: &PullRequest) -> bool {
    if pull_request.created_at == pull_request.updated_at {
        return true;
    }
    let commit = &pull_request.head_commit;
    let reference = [
        watermark.timestamp(),
        commit.authored_at,
        commit.committed_at,
        commit.pushed_at,
    ]
    .into_iter()
    .flatten()
    .max();
    reference.is_none_or(|reference| pull_request.created_at > reference)
}

/// An event of `kind` happened after the watermark.
#[must_use]
pub fn has_event_since(
    kind: TimelineEventKind,
    watermark: Watermark,
    pull_request: &PullRequest,
) -> bool {
    pull_request
        .events_of(kind)
        .any(|event| watermark.admits(event.created_at))
}

/// A comment asks CI to build the pull request.
#[must_use]
pub fn build_ci_comment(pull_request: &PullRequest) -> bool {
    pull_request
        .comments
        .iter()
        .any(|comment| contains_build_ci(&comment.body))
}

/// The head commit moved after the watermark.
#[must_use]
pub fn new_commits(watermark: Watermark, pull_request: &PullRequest) -> bool {
    let Some(watermark) = watermark.timestamp() else {
        return true;
    };
    pull_request
        .head_commit
        .latest_activity()
        .is_some_and(|latest| latest > watermark)
}

/// Rules that remove a snapshot regardless of other signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionRule {
    /// `[skip ci]` in title or commit message.
    SkipCi,
    /// Base branch differs from the required one.
    BaseBranchMismatch,
    /// Not enough approving reviews.
    InsufficientApprovals,
    /// None of the required labels present.
    MissingRequiredLabel,
    /// Cross-repository pull request while forks are disabled.
    Forked,
}

impl ExclusionRule {
    /// Evaluation order.
    pub const ORDERED: [Self; 5] = [
        Self::SkipCi,
        Self::BaseBranchMismatch,
        Self::InsufficientApprovals,
        Self::MissingRequiredLabel,
        Self::Forked,
    ];

    /// Stable name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SkipCi => "skip_ci",
            Self::BaseBranchMismatch => "base_branch_mismatch",
            Self::InsufficientApprovals => "insufficient_approvals",
            Self::MissingRequiredLabel => "missing_required_label",
            Self::Forked => "forked",
        }
    }

    /// Evaluate the rule.
    #[must_use]
    pub fn applies(self, policy: &FilterPolicy, pull_request: &PullRequest) -> bool {
        match self {
            Self::SkipCi => skip_ci(policy.disable_ci_skip, pull_request),
            Self::BaseBranchMismatch => {
                base_branch_mismatch(policy.base_branch.as_deref(), pull_request)
            },
            Self::InsufficientApprovals => {
                insufficient_approvals(policy.required_review_approvals, pull_request)
            },
            Self::MissingRequiredLabel => missing_required_label(&policy.labels, pull_request),
            Self::Forked => forked(policy.disable_forks, pull_request),
        }
    }
}

/// Rules that mark a snapshot as a new version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InclusionRule {
    /// Pull request newer than anything observed.
    FreshlyCreated,
    /// Base branch changed.
    BaseRefChanged,
    /// Base branch force pushed.
    BaseRefForcePushed,
    /// Head branch force pushed.
    HeadRefForcePushed,
    /// Pull request reopened.
    Reopened,
    /// `[build ci]` comment.
    BuildCiComment,
    /// Head commit newer than the watermark.
    NewCommits,
}

impl InclusionRule {
    /// Evaluation order.
    pub const ORDERED: [Self; 7] = [
        Self::FreshlyCreated,
        Self::BaseRefChanged,
        Self::BaseRefForcePushed,
        Self::HeadRefForcePushed,
        Self::Reopened,
        Self::BuildCiComment,
        Self::NewCommits,
    ];

    /// Stable name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FreshlyCreated => "freshly_created",
            Self::BaseRefChanged => "base_ref_changed",
            Self::BaseRefForcePushed => "base_ref_force_pushed",
            Self::HeadRefForcePushed => "head_ref_force_pushed",
            Self::Reopened => "reopened",
            Self::BuildCiComment => "build_ci_comment",
            Self::NewCommits => "new_commits",
        }
    }

    /// Evaluate the rule.
    #[must_use]
    pub fn applies(self, watermark: Watermark, pull_request: &PullRequest) -> bool {
        match self {
            Self::FreshlyCreated => freshly_created(watermark, pull_request),
            Self::BaseRefChanged => {
                has_event_since(TimelineEventKind::BaseRefChanged, watermark, pull_request)
            },
            Self::BaseRefForcePushed => {
                has_event_since(TimelineEventKind::BaseRefForcePushed, watermark, pull_request)
            },
            Self::HeadRefForcePushed => {
                has_event_since(TimelineEventKind::HeadRefForcePushed, watermark, pull_request)
            },
            Self::Reopened => has_event_since(TimelineEventKind::Reopened, watermark, pull_request),
            Self::BuildCiComment => build_ci_comment(pull_request),
            Self::NewCommits => new_commits(watermark, pull_request),
        }
    }
}

/// Which list a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Exclusionary rule.
    Exclusion,
    /// Inclusionary rule.
    Inclusion,
}

impl RuleKind {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclusion => "exclusion",
            Self::Inclusion => "inclusion",
        }
    }
}

/// One rule evaluation, as reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Rule list.
    pub kind: RuleKind,
    /// Rule name.
    pub rule: &'static str,
    /// Whether the rule fired.
    pub fired: bool,
}

/// Result of evaluating a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Removed by an exclusionary rule.
    Excluded(ExclusionRule),
    /// Qualified by an inclusionary rule.
    Candidate(InclusionRule),
    /// Nothing signalled newness.
    Dropped,
}

impl FilterDecision {
    /// Returns true for candidates.
    #[must_use]
    pub const fn is_candidate(self) -> bool {
        matches!(self, Self::Candidate(_))
    }
}

/// Evaluate all rules for one snapshot, reporting each evaluation.
pub fn evaluate(
    policy: &FilterPolicy,
    watermark: Watermark,
    pull_request: &PullRequest,
    mut observe: impl FnMut(RuleOutcome),
) -> FilterDecision {
    let excluded = ExclusionRule::ORDERED.into_iter().find(|rule| {
        let fired = rule.applies(policy, pull_request);
        observe(RuleOutcome {
            kind: RuleKind::Exclusion,
            rule: rule.name(),
            fired,
        });
        fired
    });
    if let Some(rule) = excluded {
        return FilterDecision::Excluded(rule);
    }

    InclusionRule::ORDERED
        .into_iter()
        .find(|rule| {
            let fired = rule.applies(watermark, pull_request);
            observe(RuleOutcome {
                kind: RuleKind::Inclusion,
                rule: rule.name(),
                fired,
            });
            fired
        })
        .map_or(FilterDecision::Dropped, FilterDecision::Candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{CommitId, PrimitiveError, PullRequestNumber};
    use crate::pull_request::{Commit, IssueComment, TimelineEvent};
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn snapshot() -> Result<PullRequest, PrimitiveError> {
        Ok(PullRequest {
            number: PullRequestNumber::new(1)?,
            node_id: "PR_1".into(),
            title: "Add feature".into(),
            url: "https://github.com/o/r/pull/1".into(),
            repository_url: "https://github.com/o/r".into(),
            base_ref_name: "main".into(),
            base_ref_oid: None,
            head_ref_name: "feature".into(),
            is_cross_repository: false,
            created_at: ts(1),
            updated_at: ts(6),
            head_commit: Commit {
                id: CommitId::parse("abc")?,
                abbreviated_id: "abc".into(),
                authored_at: Some(ts(4)),
                committed_at: Some(ts(4)),
                pushed_at: Some(ts(5)),
                message: "change things".into(),
                author: Some("octocat".into()),
            },
            events: Vec::new(),
            comments: Vec::new(),
            approved_review_count: 0,
            labels: Vec::new(),
            changed_files: None,
        })
    }

    #[test]
    fn skip_ci_directive_matching() {
        assert!(!contains_skip_ci("("));
        assert!(!contains_skip_ci("test"));
        assert!(contains_skip_ci("[ci skip]"));
        assert!(contains_skip_ci("[skip ci]"));
        assert!(contains_skip_ci("trailing [skip ci]"));
        assert!(contains_skip_ci("[skip ci] leading"));
        assert!(contains_skip_ci("case[Skip CI]insensitive"));
        assert!(!contains_skip_ci("ci [ skip]"));
    }

    #[test]
    fn build_ci_directive_matching() {
        assert!(contains_build_ci("please [ci build]"));
        assert!(contains_build_ci("[BUILD CI]"));
        assert!(!contains_build_ci("build ci"));
    }

    #[test]
    fn skip_ci_checks_title_and_message() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        pr.title = "WIP [skip ci]".into();
        assert!(skip_ci(false, &pr));
        assert!(!skip_ci(true, &pr));

        let mut pr = snapshot()?;
        pr.head_commit.message = "this is a test [ci skip]".into();
        assert!(skip_ci(false, &pr));
        Ok(())
    }

    #[test]
    fn base_branch_rule() -> Result<(), PrimitiveError> {
        let pr = snapshot()?;
        assert!(!base_branch_mismatch(None, &pr));
        assert!(!base_branch_mismatch(Some("main"), &pr));
        assert!(base_branch_mismatch(Some("develop"), &pr));
        Ok(())
    }

    #[test]
    fn approvals_boundary() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        pr.approved_review_count = 2;
        assert!(insufficient_approvals(3, &pr));
        assert!(!insufficient_approvals(2, &pr));
        assert!(!insufficient_approvals(0, &pr));
        Ok(())
    }

    #[test]
    fn labels_rule_needs_one_intersection() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        let required: Vec<Box<str>> = vec!["ready".into(), "ci".into()];
        assert!(missing_required_label(&required, &pr));
        assert!(!missing_required_label(&[], &pr));

        pr.labels = vec!["docs".into(), "ci".into()];
        assert!(!missing_required_label(&required, &pr));
        Ok(())
    }

    #[test]
    fn forks_rule() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        assert!(!forked(true, &pr));
        pr.is_cross_repository = true;
        assert!(forked(true, &pr));
        assert!(!forked(false, &pr));
        Ok(())
    }

    #[test]
    fn freshly_created_rule() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        assert!(!freshly_created(Watermark::ABSENT, &pr));

        pr.updated_at = pr.created_at;
        assert!(freshly_created(Watermark::at(ts(9)), &pr));

        let mut pr = snapshot()?;
        pr.created_at = ts(7);
        assert!(freshly_created(Watermark::at(ts(6)), &pr));
        assert!(!freshly_created(Watermark::at(ts(8)), &pr));
        Ok(())
    }

    #[test]
    fn new_commits_rule() -> Result<(), PrimitiveError> {
        let pr = snapshot()?;
        assert!(new_commits(Watermark::ABSENT, &pr));
        assert!(new_commits(Watermark::at(ts(4)), &pr));
        assert!(!new_commits(Watermark::at(ts(5)), &pr));
        Ok(())
    }

    #[test]
    fn events_must_be_newer_than_watermark() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        pr.events = vec![TimelineEvent {
            kind: TimelineEventKind::Reopened,
            created_at: ts(3),
        }];
        assert!(has_event_since(TimelineEventKind::Reopened, Watermark::ABSENT, &pr));
        assert!(has_event_since(TimelineEventKind::Reopened, Watermark::at(ts(2)), &pr));
        assert!(!has_event_since(TimelineEventKind::Reopened, Watermark::at(ts(3)), &pr));
        assert!(!has_event_since(TimelineEventKind::BaseRefChanged, Watermark::ABSENT, &pr));
        Ok(())
    }

    #[test]
    fn build_ci_comment_rule() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        assert!(!build_ci_comment(&pr));
        pr.comments = vec![IssueComment {
            body: "retry please [ci build]".into(),
            created_at: ts(2),
        }];
        assert!(build_ci_comment(&pr));
        Ok(())
    }

    #[test]
    fn exclusion_short_circuits_before_inclusion() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        pr.title = "[skip ci] wip".into();
        pr.is_cross_repository = true;
        let policy = FilterPolicy {
            disable_forks: true,
            ..FilterPolicy::default()
        };

        let mut seen = Vec::new();
        let decision = evaluate(&policy, Watermark::ABSENT, &pr, |outcome| seen.push(outcome));

        assert_eq!(decision, FilterDecision::Excluded(ExclusionRule::SkipCi));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen.first().map(|o| o.rule), Some("skip_ci"));
        Ok(())
    }

    #[test]
    fn fork_exclusion_beats_new_commits() -> Result<(), PrimitiveError> {
        let mut pr = snapshot()?;
        pr.is_cross_repository = true;
        let policy = FilterPolicy {
            disable_forks: true,
            ..FilterPolicy::default()
        };
        let decision = evaluate(&policy, Watermark::ABSENT, &pr, |_| {});
        assert_eq!(decision, FilterDecision::Excluded(ExclusionRule::Forked));
        Ok(())
    }

    #[test]
    fn first_inclusion_rule_wins() -> Result<(), PrimitiveError> {
        let pr = snapshot()?;
        let mut seen = Vec::new();
        let decision = evaluate(&FilterPolicy::default(), Watermark::ABSENT, &pr, |outcome| {
            seen.push(outcome);
        });

        assert_eq!(decision, FilterDecision::Candidate(InclusionRule::NewCommits));
        assert_eq!(seen.len(), ExclusionRule::ORDERED.len() + InclusionRule::ORDERED.len());
        assert!(seen.iter().take(5).all(|o| o.kind == RuleKind::Exclusion && !o.fired));
        Ok(())
    }

    #[test]
    fn stale_snapshot_is_dropped() -> Result<(), PrimitiveError> {
        let pr = snapshot()?;
        let decision = evaluate(&FilterPolicy::default(), Watermark::at(ts(6)), &pr, |_| {});
        assert_eq!(decision, FilterDecision::Dropped);
        assert!(!decision.is_candidate());
        Ok(())
    }
}
