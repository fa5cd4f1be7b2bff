//! Pull request source boundary contract.

use crate::BoxFuture;
use chrono::{DateTime, Utc};
use prcheck_domain::{PullRequest, PullRequestNumber};
use prcheck_shared::{RequestContext, Result};

/// Request for open pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPullRequestsRequest {
    /// Only pull requests updated at or after this instant are returned.
    pub since: DateTime<Utc>,
}

/// Request for the files changed by one pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListChangedFilesRequest {
    /// Pull request to inspect.
    pub number: PullRequestNumber,
}

/// Boundary contract for the code-hosting service.
///
/// Implementations own transport, authentication, pagination, and retries.
pub trait PullRequestSourcePort: Send + Sync {
    /// List currently open pull requests with `updated >= since`.
    fn list_open_pull_requests(
        &self,
        ctx: &RequestContext,
        request: ListPullRequestsRequest,
    ) -> BoxFuture<'_, Result<Vec<PullRequest>>>;

    /// List the paths changed by a pull request.
    fn list_changed_files(
        &self,
        ctx: &RequestContext,
        request: ListChangedFilesRequest,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>>;
}
