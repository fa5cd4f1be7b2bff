//! Check command handler.

use crate::CliOutput;
use crate::commands::failure;
use crate::error::{CliError, ExitCode};
use crate::format::OutputFormat;
use chrono::Utc;
use prcheck_adapters::{
    GitHubPullRequestSource, GitHubSourceConfig, GitignorePathMatcher, JsonLogger, StderrLogSink,
    TracingLogger,
};
use prcheck_app::{CheckDeps, CheckInput, check};
use prcheck_config::{LogFormat, ResourceEnv, parse_check_request_json};
use prcheck_domain::Version;
use prcheck_ports::{LogFields, LogLevel, LoggerPort};
use prcheck_shared::{ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Run the check command: read a request, resolve versions, print them.
pub fn run_check(format: OutputFormat, request: Option<&Path>) -> Result<CliOutput, CliError> {
    let raw = read_request(request)?;
    let env = match ResourceEnv::from_std_env() {
        Ok(env) => env,
        Err(error) => return Ok(failure(format, &ErrorEnvelope::from(error))),
    };

    init_tracing(&env);
    let logger = build_logger(&env);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(resolve(&raw, &env, logger)) {
        Ok(versions) => {
            let mut stdout = serde_json::to_string(&versions)?;
            stdout.push('\n');
            Ok(CliOutput {
                stdout,
                stderr: String::new(),
                exit_code: ExitCode::Ok,
            })
        },
        Err(error) => Ok(failure(format, &error)),
    }
}

async fn resolve(
    raw: &str,
    env: &ResourceEnv,
    logger: Arc<dyn LoggerPort>,
) -> Result<Vec<Version>> {
    let request = parse_check_request_json(raw)?;
    let github = GitHubSourceConfig::from_source_config(&request.source, env.http_timeout_ms());
    let deps = CheckDeps {
        source: Arc::new(GitHubPullRequestSource::new(&github)?),
        path_matcher: Arc::new(GitignorePathMatcher::new()),
        logger: Some(logger),
    };

    let ctx = RequestContext::new_request();
    let interrupt = ctx.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let input = CheckInput {
        policy: request.source.policy(),
        previous: request.previous,
        now: Utc::now(),
    };
    let result = check(&ctx, &deps, input).await;
    watcher.abort();
    result
}

fn read_request(path: Option<&Path>) -> Result<String, CliError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        },
    };
    if raw.trim().is_empty() {
        return Err(CliError::InvalidInput("check request is empty".to_owned()));
    }
    Ok(raw)
}

fn log_level(env: &ResourceEnv) -> &str {
    env.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
}

// Adapter-level `tracing` events go to stderr; stdout carries only versions.
fn init_tracing(env: &ResourceEnv) {
    let filter =
        EnvFilter::try_new(log_level(env)).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    let _ = match env.log_format.unwrap_or_default() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

fn build_logger(env: &ResourceEnv) -> Arc<dyn LoggerPort> {
    let base_fields: LogFields = env
        .build
        .log_fields()
        .into_iter()
        .map(|(key, value)| (Box::from(key), Value::from(value.into_string())))
        .collect();

    match env.log_format.unwrap_or_default() {
        LogFormat::Json => {
            let level = LogLevel::parse(log_level(env)).unwrap_or(LogLevel::Info);
            Arc::new(
                JsonLogger::new(Arc::new(StderrLogSink))
                    .with_base_fields(base_fields)
                    .with_min_level(level),
            )
        },
        LogFormat::Text => Arc::new(TracingLogger::new(base_fields)),
    }
}
