//! The `check` use case: resolve new pull request versions.
//!
//! Stages, in order:
//! 1. fetch open pull requests updated since the watermark;
//! 2. run the predicate set over each snapshot, then the path policy over
//!    candidates when path filters are configured;
//! 3. sort and collapse the surviving versions against the previous one.
//!
//! The use case keeps no state between calls and never retries; any
//! collaborator error aborts the call with the failing stage attached.

use crate::collapse::collapse;
use crate::path_filter::{PathDecision, apply_path_policy};
use chrono::{DateTime, SecondsFormat, Utc};
use prcheck_domain::{
    FilterDecision, FilterPolicy, PullRequest, RuleOutcome, Version, Watermark, evaluate,
};
use prcheck_ports::{
    ListChangedFilesRequest, ListPullRequestsRequest, LogFields, LoggerPort, PathMatcherPort,
    PullRequestSourcePort,
};
use prcheck_shared::{ErrorEnvelope, RequestContext, Result, ResultExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Stage tag for the pull request listing.
pub const STAGE_FETCH_PULL_REQUESTS: &str = "fetch_pull_requests";
/// Stage tag for changed-file lookups.
pub const STAGE_FETCH_CHANGED_FILES: &str = "fetch_changed_files";
/// Stage tag for path pattern evaluation.
pub const STAGE_MATCH_PATHS: &str = "match_paths";

/// Input payload for a check.
#[derive(Debug, Clone)]
pub struct CheckInput {
    /// Predicate inputs from the source configuration.
    pub policy: FilterPolicy,
    /// Newest version the caller already knows, if any.
    pub previous: Option<Version>,
    /// Reference instant for the cold-start lookback.
    pub now: DateTime<Utc>,
}

/// Dependencies required by the check.
#[derive(Clone)]
pub struct CheckDeps {
    /// Pull request source.
    pub source: Arc<dyn PullRequestSourcePort>,
    /// Changed-file matcher.
    pub path_matcher: Arc<dyn PathMatcherPort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Resolve the versions to report for one poll.
#[tracing::instrument(
    name = "check",
    skip_all,
    fields(correlation_id = ctx.correlation_id().as_str())
)]
pub async fn check(
    ctx: &RequestContext,
    deps: &CheckDeps,
    input: CheckInput,
) -> Result<Vec<Version>> {
    let started_at = Instant::now();
    let watermark = Watermark::from_previous(input.previous.as_ref());

    if let Some(logger) = deps.logger.as_ref() {
        logger.info(
            "check.start",
            "Check started",
            Some(log_fields_start(&input, watermark)),
        );
    }

    match run_check(ctx, deps, input, watermark).await {
        Ok((versions, stats)) => {
            if let Some(logger) = deps.logger.as_ref() {
                logger.info(
                    "check.completed",
                    "Check completed",
                    Some(log_fields_completed(&versions, stats, started_at)),
                );
            }
            Ok(versions)
        },
        Err(error) => {
            if let Some(logger) = deps.logger.as_ref() {
                let fields = log_fields_error(&error, started_at);
                if error.is_cancelled() {
                    logger.info("check.aborted", "Check aborted", Some(fields));
                } else {
                    logger.error("check.failed", "Check failed", Some(fields));
                }
            }
            Err(error)
        },
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CheckStats {
    fetched: usize,
    candidates: usize,
    path_excluded: usize,
}

async fn run_check(
    ctx: &RequestContext,
    deps: &CheckDeps,
    input: CheckInput,
    watermark: Watermark,
) -> Result<(Vec<Version>, CheckStats)> {
    ctx.ensure_not_cancelled("check.fetch_pull_requests")?;

    let since = watermark.fetch_since(input.now);
    let pull_requests = deps
        .source
        .list_open_pull_requests(ctx, ListPullRequestsRequest { since })
        .await
        .with_stage(STAGE_FETCH_PULL_REQUESTS)?;

    let mut stats = CheckStats {
        fetched: pull_requests.len(),
        ..CheckStats::default()
    };
    let mut versions = Vec::new();

    for pull_request in pull_requests {
        ctx.ensure_not_cancelled("check.filter")?;

        let number = pull_request.number.get();
        let decision = evaluate(&input.policy, watermark, &pull_request, |outcome| {
            log_predicate(deps, number, outcome);
        });
        if !decision.is_candidate() {
            log_decision(deps, number, decision);
            continue;
        }
        stats.candidates += 1;

        let pull_request = if input.policy.has_path_filters() {
            match filter_paths(ctx, deps, &input.policy, pull_request).await? {
                Some(pull_request) => pull_request,
                None => {
                    stats.path_excluded += 1;
                    continue;
                },
            }
        } else {
            pull_request
        };

        versions.push(Version::of(&pull_request));
    }

    Ok((collapse(versions, input.previous), stats))
}

async fn filter_paths(
    ctx: &RequestContext,
    deps: &CheckDeps,
    policy: &FilterPolicy,
    pull_request: PullRequest,
) -> Result<Option<PullRequest>> {
    ctx.ensure_not_cancelled("check.fetch_changed_files")?;

    let number = pull_request.number.get();
    let files = deps
        .source
        .list_changed_files(
            ctx,
            ListChangedFilesRequest {
                number: pull_request.number,
            },
        )
        .await
        .with_error_metadata("pr", number.to_string())
        .with_stage(STAGE_FETCH_CHANGED_FILES)?;

    let pull_request = pull_request.with_changed_files(files);
    let files = pull_request.changed_files.as_deref().unwrap_or_default();
    let decision = apply_path_policy(deps.path_matcher.as_ref(), policy, files)
        .with_error_metadata("pr", number.to_string())
        .with_stage(STAGE_MATCH_PATHS)?;

    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = pr_fields(number);
        insert(&mut fields, "changed_files", Value::from(files.len()));
        insert(&mut fields, "decision", Value::from(decision.as_str()));
        logger.debug("check.paths", "Path policy evaluated", Some(fields));
    }

    Ok((decision == PathDecision::Included).then_some(pull_request))
}

fn log_predicate(deps: &CheckDeps, number: u64, outcome: RuleOutcome) {
    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = pr_fields(number);
        insert(&mut fields, "kind", Value::from(outcome.kind.as_str()));
        insert(&mut fields, "rule", Value::from(outcome.rule));
        insert(&mut fields, "fired", Value::Bool(outcome.fired));
        logger.debug("check.predicate", "Predicate evaluated", Some(fields));
    }
}

fn log_decision(deps: &CheckDeps, number: u64, decision: FilterDecision) {
    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = pr_fields(number);
        let reason = match decision {
            FilterDecision::Excluded(rule) => rule.name(),
            FilterDecision::Candidate(rule) => rule.name(),
            FilterDecision::Dropped => "no_inclusion_rule",
        };
        insert(&mut fields, "reason", Value::from(reason));
        logger.debug("check.skipped", "Pull request skipped", Some(fields));
    }
}

fn log_fields_start(input: &CheckInput, watermark: Watermark) -> LogFields {
    let mut fields = LogFields::new();
    insert(
        &mut fields,
        "previous_pr",
        input
            .previous
            .as_ref()
            .map_or(Value::Null, |previous| Value::from(previous.pr.get())),
    );
    insert(
        &mut fields,
        "watermark",
        watermark.timestamp().map_or(Value::Null, |timestamp| {
            Value::from(timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
        }),
    );
    insert(
        &mut fields,
        "path_filters",
        Value::Bool(input.policy.has_path_filters()),
    );
    fields
}

fn log_fields_completed(versions: &[Version], stats: CheckStats, started_at: Instant) -> LogFields {
    let mut fields = LogFields::new();
    insert(&mut fields, "fetched", Value::from(stats.fetched));
    insert(&mut fields, "candidates", Value::from(stats.candidates));
    insert(&mut fields, "path_excluded", Value::from(stats.path_excluded));
    insert(&mut fields, "versions", Value::from(versions.len()));
    insert(&mut fields, "duration_ms", Value::from(duration_ms(started_at)));
    fields
}

fn log_fields_error(error: &ErrorEnvelope, started_at: Instant) -> LogFields {
    let mut fields = LogFields::new();
    insert(&mut fields, "duration_ms", Value::from(duration_ms(started_at)));
    insert(&mut fields, "error", Value::String(error.to_string()));
    if let Some(stage) = error.stage() {
        insert(&mut fields, "stage", Value::from(stage));
    }
    fields
}

fn pr_fields(number: u64) -> LogFields {
    let mut fields = LogFields::new();
    insert(&mut fields, "pr", Value::from(number));
    fields
}

fn insert(fields: &mut LogFields, key: &str, value: Value) {
    fields.insert(key.to_owned().into_boxed_str(), value);
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
