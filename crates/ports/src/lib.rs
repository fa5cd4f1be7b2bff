//! # prcheck-ports
//!
//! Port traits between the check use case and the outside world.
//!
//! This crate depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by async port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod logger;
pub mod paths;
pub mod pull_requests;

pub use logger::*;
pub use paths::*;
pub use pull_requests::*;

// Re-export domain types used in port signatures so adapters can implement
// ports without naming the domain crate.
pub use prcheck_domain::{
    Commit, CommitId, IssueComment, PullRequest, PullRequestNumber, RepositorySlug, TimelineEvent,
    TimelineEventKind,
};
