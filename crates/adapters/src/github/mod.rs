//! GitHub GraphQL v4 pull request source.
//!
//! Every page request is bounded by the client timeout, raced against
//! request cancellation, and retried on retriable failures. Pagination keeps
//! going until `hasNextPage` is false.

mod query;
mod response;

use self::query::{GraphQlRequest, PREVIEW_ACCEPT};
use self::response::{ChangedFilesData, GraphQlResponse, SearchData, Unmappable};
use prcheck_config::ValidatedSourceConfig;
use prcheck_ports::{
    BoxFuture, ListChangedFilesRequest, ListPullRequestsRequest, PullRequest,
    PullRequestSourcePort, RepositorySlug,
};
use prcheck_shared::{
    ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result, RetryPolicy, SecretString,
    retry_async_with_observer,
};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Public GitHub GraphQL endpoint.
pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

const USER_AGENT_VALUE: &str = concat!("prcheck/", env!("CARGO_PKG_VERSION"));

/// GitHub adapter configuration.
#[derive(Debug, Clone)]
pub struct GitHubSourceConfig {
    /// Repository to query.
    pub repository: RepositorySlug,
    /// Access token sent as a bearer token.
    pub access_token: SecretString,
    /// GraphQL endpoint override (defaults to the public API).
    pub graphql_endpoint: Option<Box<str>>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Accept invalid TLS certificates.
    pub skip_ssl_verification: bool,
    /// Send the preview schema `Accept` header.
    pub preview_schema: bool,
    /// Retry policy for retriable failures.
    pub retry: RetryPolicy,
}

impl GitHubSourceConfig {
    /// Build from a validated source block.
    #[must_use]
    pub fn from_source_config(source: &ValidatedSourceConfig, timeout_ms: u64) -> Self {
        Self {
            repository: source.repository().clone(),
            access_token: source.access_token().clone(),
            graphql_endpoint: source
                .endpoints()
                .map(|endpoints| endpoints.v4.as_str().into()),
            timeout_ms,
            skip_ssl_verification: source.skip_ssl_verification,
            preview_schema: source.preview_schema,
            retry: RetryPolicy::default(),
        }
    }
}

/// GitHub GraphQL adapter implementation.
pub struct GitHubPullRequestSource {
    client: reqwest::Client,
    endpoint: Box<str>,
    repository: RepositorySlug,
    retry: RetryPolicy,
}

impl GitHubPullRequestSource {
    /// Create a new GitHub adapter.
    pub fn new(config: &GitHubSourceConfig) -> Result<Self> {
        if config.access_token.is_blank() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "access token must be set",
            ));
        }
        if config.timeout_ms == 0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "timeout must be greater than zero",
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth_header =
            HeaderValue::from_str(&format!("bearer {}", config.access_token.expose().trim()))
                .map_err(|_| {
                    ErrorEnvelope::expected(
                        ErrorCode::invalid_input(),
                        "access token contains invalid header characters",
                    )
                })?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if config.preview_schema {
            headers.insert(ACCEPT, HeaderValue::from_static(PREVIEW_ACCEPT));
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers);
        if config.skip_ssl_verification {
            tracing::warn!("TLS certificate verification disabled for GitHub requests");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(|error| {
            ErrorEnvelope::unexpected(
                ErrorCode::new("github", "client_init_failed"),
                format!("failed to build GitHub client: {error}"),
                ErrorClass::NonRetriable,
            )
        })?;

        let endpoint = config
            .graphql_endpoint
            .as_deref()
            .map_or(DEFAULT_GRAPHQL_ENDPOINT, str::trim)
            .to_owned()
            .into_boxed_str();

        Ok(Self {
            client,
            endpoint,
            repository: config.repository.clone(),
            retry: config.retry,
        })
    }

    async fn list_open(
        &self,
        ctx: &RequestContext,
        request: ListPullRequestsRequest,
    ) -> Result<Vec<PullRequest>> {
        let mut pull_requests = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0u32;

        loop {
            page = page.saturating_add(1);
            let body = GraphQlRequest {
                query: query::OPEN_PULL_REQUESTS,
                variables: query::open_pull_requests_variables(
                    &self.repository,
                    request.since,
                    cursor.as_deref(),
                ),
            };
            let data: SearchData = self
                .query_with_retry(ctx, &body, "github.list_open_pull_requests")
                .await?;
            let connection = data.search;
            tracing::debug!(
                page,
                results = connection.edges.len(),
                has_next_page = connection.page_info.has_next_page,
                "fetched pull request page"
            );

            for node in connection.edges.into_iter().filter_map(|edge| edge.node) {
                let number = node.number;
                match node.into_snapshot() {
                    Ok(snapshot) => pull_requests.push(snapshot),
                    Err(Unmappable::MissingHeadCommit) => {
                        tracing::warn!(pr = number, "skipping pull request without head commit");
                    },
                    Err(Unmappable::Invalid(error)) => {
                        return Err(invalid_response(format!(
                            "pull request {number} is malformed: {error}"
                        )));
                    },
                }
            }

            match next_cursor(connection.page_info.has_next_page, connection.page_info.end_cursor) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(pull_requests)
    }

    async fn list_files(
        &self,
        ctx: &RequestContext,
        request: ListChangedFilesRequest,
    ) -> Result<Vec<Box<str>>> {
        let number = request.number.get();
        let mut files = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = GraphQlRequest {
                query: query::CHANGED_FILES,
                variables: query::changed_files_variables(
                    &self.repository,
                    number,
                    cursor.as_deref(),
                ),
            };
            let data: ChangedFilesData = self
                .query_with_retry(ctx, &body, "github.list_changed_files")
                .await
                .map_err(|error| error.with_metadata("pr", number.to_string()))?;
            let connection = data
                .repository
                .and_then(|repository| repository.pull_request)
                .and_then(|pull_request| pull_request.files)
                .ok_or_else(|| {
                    invalid_response(format!("pull request {number} has no files connection"))
                        .with_metadata("pr", number.to_string())
                })?;

            let (paths, page_info) = connection.paths();
            tracing::debug!(pr = number, results = paths.len(), "fetched changed files page");
            files.extend(paths);

            match next_cursor(page_info.has_next_page, page_info.end_cursor) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(files)
    }

    async fn query_with_retry<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        body: &GraphQlRequest<'_>,
        operation: &'static str,
    ) -> Result<T> {
        let mut send = || self.send_query(ctx, body, operation);
        retry_async_with_observer(ctx, self.retry, operation, &mut send, |attempt, error| {
            tracing::debug!(
                operation,
                attempt,
                code = %error.code,
                "retrying GitHub request"
            );
        })
        .await
    }

    async fn send_query<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        body: &GraphQlRequest<'_>,
        operation: &'static str,
    ) -> Result<T> {
        ctx.ensure_not_cancelled(operation)?;

        let response = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = self.client.post(self.endpoint.as_ref()).json(body).send() => {
                result.map_err(|error| map_reqwest_error(&error))?
            }
        };

        let status = response.status();
        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim() == "0");
        let payload = tokio::select! {
            () = ctx.cancelled() => return Err(cancelled_error(operation)),
            result = response.bytes() => result.map_err(|error| map_reqwest_error(&error))?,
        };

        if !status.is_success() {
            return Err(map_github_http_error(status, rate_limit_exhausted, &payload));
        }

        decode_graphql(&payload)
    }
}

impl PullRequestSourcePort for GitHubPullRequestSource {
    fn list_open_pull_requests(
        &self,
        ctx: &RequestContext,
        request: ListPullRequestsRequest,
    ) -> BoxFuture<'_, Result<Vec<PullRequest>>> {
        let ctx = ctx.clone();
        Box::pin(async move { self.list_open(&ctx, request).await })
    }

    fn list_changed_files(
        &self,
        ctx: &RequestContext,
        request: ListChangedFilesRequest,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
        let ctx = ctx.clone();
        Box::pin(async move { self.list_files(&ctx, request).await })
    }
}

fn next_cursor(has_next_page: bool, end_cursor: Option<String>) -> Option<String> {
    if has_next_page { end_cursor } else { None }
}

fn decode_graphql<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    let response: GraphQlResponse<T> = serde_json::from_slice(payload).map_err(|error| {
        invalid_response(format!("failed to decode GitHub response: {error}"))
    })?;

    if let Some(first) = response.errors.first() {
        let rate_limited = first.error_type.as_deref() == Some("RATE_LIMITED");
        let mut envelope = if rate_limited {
            ErrorEnvelope::unexpected(
                ErrorCode::rate_limited(),
                first.message.clone(),
                ErrorClass::Retriable,
            )
        } else {
            ErrorEnvelope::unexpected(
                ErrorCode::new("github", "graphql_error"),
                first.message.clone(),
                ErrorClass::NonRetriable,
            )
        };
        if let Some(error_type) = first.error_type.as_deref() {
            envelope = envelope.with_metadata("error_type", error_type.to_string());
        }
        return Err(envelope.with_metadata("error_count", response.errors.len().to_string()));
    }

    response
        .data
        .ok_or_else(|| invalid_response("GitHub response has no data"))
}

fn invalid_response(message: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("github", "invalid_response"),
        message,
        ErrorClass::NonRetriable,
    )
}

fn cancelled_error(operation: &'static str) -> ErrorEnvelope {
    ErrorEnvelope::cancelled("operation cancelled").with_metadata("operation", operation)
}

fn map_reqwest_error(error: &reqwest::Error) -> ErrorEnvelope {
    if error.is_timeout() {
        return ErrorEnvelope::unexpected(
            ErrorCode::timeout(),
            "GitHub request timed out",
            ErrorClass::Retriable,
        );
    }
    if error.is_connect() {
        return ErrorEnvelope::unexpected(
            ErrorCode::io(),
            format!("GitHub connection failed: {error}"),
            ErrorClass::Retriable,
        );
    }
    ErrorEnvelope::unexpected(
        ErrorCode::new("github", "request_failed"),
        format!("GitHub request failed: {error}"),
        ErrorClass::NonRetriable,
    )
}

#[derive(Debug, serde::Deserialize)]
struct GitHubErrorBody {
    message: String,
}

fn map_github_http_error(
    status: StatusCode,
    rate_limit_exhausted: bool,
    payload: &[u8],
) -> ErrorEnvelope {
    let message = serde_json::from_slice::<GitHubErrorBody>(payload).map_or_else(
        |_| format!("GitHub request failed with status {}", status.as_u16()),
        |body| body.message,
    );
    let envelope = match status.as_u16() {
        403 | 429 if rate_limit_exhausted || status == StatusCode::TOO_MANY_REQUESTS => {
            ErrorEnvelope::unexpected(ErrorCode::rate_limited(), message, ErrorClass::Retriable)
        },
        401 | 403 => ErrorEnvelope::expected(ErrorCode::permission_denied(), message),
        404 => ErrorEnvelope::expected(ErrorCode::not_found(), message),
        408 => ErrorEnvelope::unexpected(ErrorCode::timeout(), message, ErrorClass::Retriable),
        _ if status.is_server_error() => ErrorEnvelope::unexpected(
            ErrorCode::dependency_unavailable(),
            message,
            ErrorClass::Retriable,
        ),
        _ => ErrorEnvelope::unexpected(
            ErrorCode::new("github", "http_error"),
            message,
            ErrorClass::NonRetriable,
        ),
    };
    envelope.with_metadata("status", status.as_u16().to_string())
}
