//! `prcheck check` end-to-end tests against a mock GitHub server.

use serde_json::{Value, json};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_block(server: &MockServer, extra: &Value) -> Value {
    let mut source = json!({
        "repository": "itsdalmo/test-repository",
        "access_token": "oauthtoken",
        "v3_endpoint": format!("{}/api/v3", server.uri()),
        "v4_endpoint": format!("{}/graphql", server.uri()),
    });
    if let (Some(source), Some(extra)) = (source.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            source.insert(key.clone(), value.clone());
        }
    }
    source
}

fn pull_request_node(number: u64, updated: &str) -> Value {
    json!({
        "id": format!("PR_{number}"),
        "number": number,
        "title": format!("pr{number} title"),
        "url": format!("https://github.com/itsdalmo/test-repository/pull/{number}"),
        "baseRefName": "master",
        "baseRefOid": "sha",
        "headRefName": format!("pr{number}"),
        "isCrossRepository": false,
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": updated,
        "repository": { "url": "https://github.com/itsdalmo/test-repository" },
        "headRef": { "target": {
            "oid": format!("commit{number}"),
            "abbreviatedOid": format!("c{number}"),
            "authoredDate": updated,
            "committedDate": updated,
            "pushedDate": null,
            "message": format!("commit message{number}"),
            "author": { "user": { "login": "testuser" } }
        }},
        "labels": { "edges": [] },
        "reviews": { "totalCount": 0 },
        "timelineItems": { "edges": [] }
    })
}

fn search_page(nodes: Vec<Value>) -> Value {
    json!({
        "data": { "search": {
            "edges": nodes.into_iter().map(|node| json!({ "node": node })).collect::<Vec<_>>(),
            "pageInfo": { "endCursor": null, "hasNextPage": false }
        }}
    })
}

fn files_page(paths: &[&str]) -> Value {
    json!({ "data": { "repository": { "pullRequest": { "files": {
        "edges": paths.iter().map(|path| json!({ "node": { "path": path } })).collect::<Vec<_>>(),
        "pageInfo": { "endCursor": null, "hasNextPage": false }
    }}}}})
}

fn write_request(request: &Value) -> io::Result<PathBuf> {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("prcheck-e2e-{unique}.json"));
    std::fs::write(&path, serde_json::to_vec(request).map_err(io::Error::other)?)?;
    Ok(path)
}

fn prcheck() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_prcheck"));
    for name in [
        "PRCHECK_LOG_LEVEL",
        "PRCHECK_LOG_FORMAT",
        "PRCHECK_HTTP_TIMEOUT_MS",
        "BUILD_PIPELINE_NAME",
        "BUILD_TEAM_NAME",
        "BUILD_JOB_NAME",
        "ATC_EXTERNAL_URL",
    ] {
        command.env_remove(name);
    }
    command
}

// The mock server keeps serving while the binary runs on a blocking thread.
async fn run_check(args: Vec<String>, stdin: Option<String>) -> io::Result<Output> {
    tokio::task::spawn_blocking(move || {
        let mut child = prcheck()
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.unwrap_or_default().as_bytes())?;
        }
        child.wait_with_output()
    })
    .await
    .map_err(io::Error::other)?
}

fn stdout_json(output: &Output) -> io::Result<Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[tokio::test]
async fn bootstrap_check_prints_the_newest_version() -> io::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "bearer oauthtoken"))
        .and(body_string_contains("is:pr is:open repo:itsdalmo/test-repository"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(vec![
            pull_request_node(1, "2024-05-02T10:00:00Z"),
            pull_request_node(2, "2024-05-03T10:00:00Z"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = json!({ "source": source_block(&server, &json!({})), "version": null });
    let output = run_check(vec!["check".to_owned()], Some(request.to_string())).await?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output)?,
        json!([{ "pr": "2", "commit": "commit2", "updated": "2024-05-03T10:00:00Z" }])
    );
    Ok(())
}

#[tokio::test]
async fn steady_check_filters_by_changed_files() -> io::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("is:pr is:open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(vec![
            pull_request_node(2, "2024-05-03T10:00:00Z"),
            pull_request_node(3, "2024-05-04T10:00:00Z"),
        ])))
        .mount(&server)
        .await;
    for (number, files) in [(2_u64, vec!["main.tf"]), (3, vec!["README.md"])] {
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "n": number } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(files_page(&files)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let request = json!({
        "source": source_block(&server, &json!({ "paths": ["*.tf"] })),
        "version": { "pr": "1", "commit": "commit1", "updated": "2024-05-02T10:00:00Z" }
    });
    let request_path = write_request(&request)?;
    let args = vec![
        "check".to_owned(),
        "--request".to_owned(),
        request_path.display().to_string(),
    ];
    let output = run_check(args, None).await?;
    std::fs::remove_file(&request_path)?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_json(&output)?,
        json!([{ "pr": "2", "commit": "commit2", "updated": "2024-05-03T10:00:00Z" }])
    );
    Ok(())
}

#[tokio::test]
async fn unauthorized_requests_exit_with_a_json_error() -> io::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = json!({ "source": source_block(&server, &json!({})) });
    let args = vec!["--output".to_owned(), "json".to_owned(), "check".to_owned()];
    let output = run_check(args, Some(request.to_string())).await?;

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let error_line = stderr
        .lines()
        .find(|line| line.contains("\"status\":\"error\""))
        .ok_or_else(|| io::Error::other("missing error payload"))?;
    let payload: Value = serde_json::from_str(error_line).map_err(io::Error::other)?;
    assert_eq!(payload["error"]["code"], json!("core:permission_denied"));
    assert!(!stderr.contains("oauthtoken"));
    Ok(())
}

#[test]
fn invalid_requests_exit_with_code_two() -> io::Result<()> {
    let mut child = prcheck()
        .arg("check")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut pipe) = child.stdin.take() {
        pipe.write_all(br#"{"source": {"repository": "itsdalmo"}}"#)?;
    }
    let output = child.wait_with_output()?;

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: config:"));
    Ok(())
}

#[test]
fn empty_stdin_is_invalid_input() -> io::Result<()> {
    let output = prcheck().arg("check").stdin(Stdio::null()).output()?;

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("check request is empty"));
    Ok(())
}
