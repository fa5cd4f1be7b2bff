//! Contract-style tests for port traits using in-memory adapters.

use prcheck_ports::{
    ListChangedFilesRequest, ListPullRequestsRequest, LogFields, LoggerPort, PullRequestNumber,
    PullRequestSourcePort,
};
use prcheck_shared::{ErrorCode, RequestContext, Result};
use prcheck_testkit::errors::source_unavailable_error;
use prcheck_testkit::in_memory::{InMemoryPullRequestSource, NoopLogger, RecordingLogger};
use prcheck_testkit::snapshots::{PullRequestBuilder, at};
use serde_json::json;

#[tokio::test]
async fn source_filters_by_updated_since() -> Result<()> {
    let ctx = RequestContext::new_request();
    let source = InMemoryPullRequestSource::new(vec![
        PullRequestBuilder::new(1, at(1, 10)).build(),
        PullRequestBuilder::new(2, at(2, 10)).build(),
        PullRequestBuilder::new(3, at(3, 10)).build(),
    ]);

    let listed = source
        .list_open_pull_requests(&ctx, ListPullRequestsRequest { since: at(2, 10) })
        .await?;

    let numbers: Vec<u64> = listed.iter().map(|pr| pr.number.get()).collect();
    assert_eq!(numbers, vec![2, 3]);
    assert_eq!(source.list_calls(), 1);
    assert_eq!(source.sinces(), vec![at(2, 10)]);
    Ok(())
}

#[tokio::test]
async fn source_serves_and_records_changed_files() -> Result<()> {
    let ctx = RequestContext::new_request();
    let source = InMemoryPullRequestSource::new(Vec::new())
        .with_changed_files(4, &["a.tf", "README.md"])
        .failing_changed_files(5, source_unavailable_error());

    let files = source
        .list_changed_files(
            &ctx,
            ListChangedFilesRequest {
                number: PullRequestNumber::new(4)?,
            },
        )
        .await?;
    assert_eq!(files, vec![Box::<str>::from("a.tf"), "README.md".into()]);

    let failed = source
        .list_changed_files(
            &ctx,
            ListChangedFilesRequest {
                number: PullRequestNumber::new(5)?,
            },
        )
        .await;
    assert!(matches!(failed, Err(ref error) if error.code == ErrorCode::dependency_unavailable()));
    assert_eq!(source.changed_files_calls(), vec![4, 5]);
    Ok(())
}

#[tokio::test]
async fn source_honours_cancellation() {
    let ctx = RequestContext::new_request();
    ctx.cancel();
    let source = InMemoryPullRequestSource::new(Vec::new());

    let result = source
        .list_open_pull_requests(&ctx, ListPullRequestsRequest { since: at(1, 0) })
        .await;
    assert!(matches!(result, Err(ref error) if error.is_cancelled()));
    assert_eq!(source.list_calls(), 0);
}

#[test]
fn recording_logger_shares_events_with_children() {
    let logger = RecordingLogger::new();
    let mut fields = LogFields::new();
    fields.insert("correlation_id".into(), json!("check_1"));

    let child = logger.child(fields);
    child.info("check.start", "starting", None);
    logger.debug("check.predicate", "evaluated", None);

    let events = logger.events();
    assert_eq!(events.len(), 2);
    let start = logger.events_named("check.start");
    assert_eq!(
        start[0].fields.as_ref().and_then(|fields| fields.get("correlation_id")),
        Some(&json!("check_1"))
    );

    NoopLogger.child(LogFields::new()).info("ignored", "ignored", None);
}
