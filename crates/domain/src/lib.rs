//! # prcheck-domain
//!
//! Domain model for resolving pull request versions:
//!
//! - **Primitives** - `PullRequestNumber`, `RepositorySlug`, `CommitId`
//! - **Snapshots** - `PullRequest`, `Commit`, timeline events, comments
//! - **Versions** - `Version`, `Watermark`, chronological ordering
//! - **Filters** - exclusionary and inclusionary predicates over snapshots
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use prcheck_shared::shared_crate_version;

pub mod filters;
pub mod primitives;
pub mod pull_request;
pub mod version;

pub use filters::{
    ExclusionRule, FilterDecision, FilterPolicy, InclusionRule, RuleKind, RuleOutcome, evaluate,
};
pub use primitives::{CommitId, PrimitiveError, PullRequestNumber, RepositorySlug};
pub use pull_request::{Commit, IssueComment, PullRequest, TimelineEvent, TimelineEventKind};
pub use version::{DEFAULT_LOOKBACK_MONTHS, Version, Watermark, sort_chronologically};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
