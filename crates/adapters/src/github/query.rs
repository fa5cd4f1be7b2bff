//! GraphQL documents and variables.

use chrono::{DateTime, SecondsFormat, Utc};
use prcheck_domain::RepositorySlug;
use serde::Serialize;
use serde_json::{Value, json};

/// Page size for every paginated connection.
pub const PAGE_SIZE: u32 = 100;

/// Media types unlocking the timeline items and files connections on older
/// GitHub Enterprise servers.
pub const PREVIEW_ACCEPT: &str =
    "application/vnd.github.starfire-preview+json, application/vnd.github.ocelot-preview+json";

pub const OPEN_PULL_REQUESTS: &str = r"query($q: String!, $n: Int!, $c: String, $s: DateTime!) {
  search(query: $q, type: ISSUE, first: $n, after: $c) {
    edges {
      node {
        ... on PullRequest {
          id
          number
          title
          url
          baseRefName
          baseRefOid
          headRefName
          isCrossRepository
          createdAt
          updatedAt
          repository { url }
          headRef {
            target {
              ... on Commit {
                oid
                abbreviatedOid
                authoredDate
                committedDate
                pushedDate
                message
                author { user { login } }
              }
            }
          }
          labels(first: 100) { edges { node { name } } }
          reviews(states: APPROVED) { totalCount }
          timelineItems(last: 100, since: $s, itemTypes: [BASE_REF_CHANGED_EVENT, BASE_REF_FORCE_PUSHED_EVENT, HEAD_REF_FORCE_PUSHED_EVENT, ISSUE_COMMENT, REOPENED_EVENT]) {
            edges {
              node {
                __typename
                ... on BaseRefChangedEvent { createdAt }
                ... on BaseRefForcePushedEvent { createdAt }
                ... on HeadRefForcePushedEvent { createdAt }
                ... on IssueComment { createdAt bodyText }
                ... on ReopenedEvent { createdAt }
              }
            }
          }
        }
      }
    }
    pageInfo { endCursor hasNextPage }
  }
}";

pub const CHANGED_FILES: &str = r"query($owner: String!, $name: String!, $n: Int!, $c: String) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $n) {
      files(first: 100, after: $c) {
        edges { node { path } }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}";

/// Request body posted to the GraphQL endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

/// Search string selecting open pull requests updated at or after `since`.
#[must_use]
pub fn search_query(repository: &RepositorySlug, since: DateTime<Utc>) -> String {
    format!(
        "is:pr is:open repo:{repository} updated:>={} sort:updated",
        format_timestamp(since)
    )
}

pub fn open_pull_requests_variables(
    repository: &RepositorySlug,
    since: DateTime<Utc>,
    cursor: Option<&str>,
) -> Value {
    json!({
        "q": search_query(repository, since),
        "n": PAGE_SIZE,
        "c": cursor,
        "s": format_timestamp(since),
    })
}

pub fn changed_files_variables(
    repository: &RepositorySlug,
    number: u64,
    cursor: Option<&str>,
) -> Value {
    json!({
        "owner": repository.owner(),
        "name": repository.name(),
        "n": number,
        "c": cursor,
    })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}
