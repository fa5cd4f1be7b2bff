//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the check use case
//! - Deterministic contract tests for the ports layer

use chrono::{DateTime, Utc};
use prcheck_ports::{
    BoxFuture, ListChangedFilesRequest, ListPullRequestsRequest, LogEvent, LogFields, LoggerPort,
    PullRequest, PullRequestSourcePort,
};
use prcheck_shared::{ErrorEnvelope, RequestContext, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// A no-op logger implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger capturing events, including those of child loggers.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
    base_fields: LogFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("logger lock").clone()
    }

    /// Recorded events with the given name.
    pub fn events_named(&self, name: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event.as_ref() == name)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: LogEvent) {
        if !self.base_fields.is_empty() {
            let mut fields = self.base_fields.clone();
            fields.extend(event.fields.take().into_iter().flatten());
            event.fields = Some(fields);
        }
        self.events.lock().expect("logger lock").push(event);
    }

    fn child(&self, fields: LogFields) -> Box<dyn LoggerPort> {
        let mut base_fields = self.base_fields.clone();
        base_fields.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base_fields,
        })
    }
}

#[derive(Debug, Default)]
struct SourceState {
    list_calls: usize,
    sinces: Vec<DateTime<Utc>>,
    changed_files_calls: Vec<u64>,
}

/// Pull request source serving fixed snapshots.
///
/// Like the hosting service, it returns only snapshots updated at or after
/// the requested `since`.
#[derive(Debug, Default)]
pub struct InMemoryPullRequestSource {
    pull_requests: Vec<PullRequest>,
    changed_files: BTreeMap<u64, Vec<Box<str>>>,
    list_failure: Option<ErrorEnvelope>,
    changed_files_failures: BTreeMap<u64, ErrorEnvelope>,
    state: RwLock<SourceState>,
}

impl InMemoryPullRequestSource {
    /// Serve the given snapshots.
    pub fn new(pull_requests: Vec<PullRequest>) -> Self {
        Self {
            pull_requests,
            ..Self::default()
        }
    }

    /// Set the changed files reported for a pull request.
    pub fn with_changed_files(mut self, number: u64, files: &[&str]) -> Self {
        self.changed_files
            .insert(number, files.iter().map(|file| (*file).into()).collect());
        self
    }

    /// Fail every listing with the given error.
    pub fn failing_list(mut self, error: ErrorEnvelope) -> Self {
        self.list_failure = Some(error);
        self
    }

    /// Fail changed-file lookups for one pull request.
    pub fn failing_changed_files(mut self, number: u64, error: ErrorEnvelope) -> Self {
        self.changed_files_failures.insert(number, error);
        self
    }

    /// Number of listing calls served.
    pub fn list_calls(&self) -> usize {
        self.state.try_read().map_or(0, |state| state.list_calls)
    }

    /// `since` values received, in call order.
    pub fn sinces(&self) -> Vec<DateTime<Utc>> {
        self.state
            .try_read()
            .map(|state| state.sinces.clone())
            .unwrap_or_default()
    }

    /// Pull request numbers whose changed files were requested, in call order.
    pub fn changed_files_calls(&self) -> Vec<u64> {
        self.state
            .try_read()
            .map(|state| state.changed_files_calls.clone())
            .unwrap_or_default()
    }
}

impl PullRequestSourcePort for InMemoryPullRequestSource {
    fn list_open_pull_requests(
        &self,
        ctx: &RequestContext,
        request: ListPullRequestsRequest,
    ) -> BoxFuture<'_, Result<Vec<PullRequest>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_source.list_open_pull_requests")?;
            {
                let mut state = self.state.write().await;
                state.list_calls += 1;
                state.sinces.push(request.since);
            }
            if let Some(error) = &self.list_failure {
                return Err(error.clone());
            }
            Ok(self
                .pull_requests
                .iter()
                .filter(|pull_request| pull_request.updated_at >= request.since)
                .cloned()
                .collect())
        })
    }

    fn list_changed_files(
        &self,
        ctx: &RequestContext,
        request: ListChangedFilesRequest,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("in_memory_source.list_changed_files")?;
            let number = request.number.get();
            self.state.write().await.changed_files_calls.push(number);
            if let Some(error) = self.changed_files_failures.get(&number) {
                return Err(error.clone());
            }
            Ok(self.changed_files.get(&number).cloned().unwrap_or_default())
        })
    }
}
