//! `prcheck config` end-to-end tests.

use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

fn fixture_path(relative: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join("testkit")
        .join("fixtures")
        .join("sources")
        .join(relative)
}

fn prcheck(args: &[&str], fixture: &str) -> io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_prcheck"))
        .args(args)
        .arg(fixture_path(fixture))
        .output()
}

#[test]
fn validate_reports_the_repository() -> io::Result<()> {
    let output = prcheck(&["config", "validate"], "minimal.json")?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("status: ok\n"));
    assert!(stdout.contains("repository: itsdalmo/test-repository\n"));
    Ok(())
}

#[test]
fn validate_supports_json_output_and_toml_sources() -> io::Result<()> {
    let output = prcheck(&["--output", "json", "config", "validate"], "enterprise.toml")?;

    assert!(output.status.success());
    let payload: Value = serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(payload["status"], Value::from("ok"));
    assert_eq!(payload["repository"], Value::from("platform/infrastructure"));
    assert_eq!(payload["enterprise"], Value::Bool(true));
    assert_eq!(payload["paths"], Value::from(1));
    Ok(())
}

#[test]
fn validate_rejects_a_single_enterprise_endpoint() -> io::Result<()> {
    let output = prcheck(&["--output", "json", "config", "validate"], "missing_v4.json")?;

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let payload: Value = serde_json::from_slice(&output.stderr).map_err(io::Error::other)?;
    assert_eq!(payload["status"], Value::from("error"));
    let code = payload["error"]["code"].as_str().unwrap_or_default();
    assert!(code.starts_with("config:"), "unexpected code {code}");
    Ok(())
}

#[test]
fn show_redacts_the_access_token() -> io::Result<()> {
    let json = prcheck(&["config", "show"], "full.json")?;
    let toml = prcheck(&["config", "show", "--format", "toml"], "full.json")?;

    assert!(json.status.success());
    assert!(toml.status.success());
    for output in [&json, &toml] {
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("itsdalmo/test-repository"));
        assert!(!stdout.contains("oauthtoken"));
    }
    let payload: Value = serde_json::from_slice(&json.stdout).map_err(io::Error::other)?;
    assert!(payload.get("repository").is_some());
    Ok(())
}

#[test]
fn missing_files_are_reported() -> io::Result<()> {
    let output = prcheck(&["config", "validate"], "does-not-exist.json")?;

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: config:config_file_not_found: "));
    Ok(())
}
