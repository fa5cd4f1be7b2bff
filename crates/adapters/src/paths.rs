//! Gitignore-style changed-file matcher.
//!
//! Patterns are compiled in order with `ignore`'s gitignore engine, so a
//! later `!pattern` re-includes paths matched by an earlier one. A pattern
//! ending in `/` matches everything nested under that directory, and matching
//! walks parent directories so `foo/` matches `foo/a/b` but never `foobar`.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use prcheck_ports::PathMatcherPort;
use prcheck_shared::{ErrorCode, ErrorEnvelope, Result};
use std::path::Path;

/// Path matcher backed by gitignore semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitignorePathMatcher;

impl GitignorePathMatcher {
    /// Build a matcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PathMatcherPort for GitignorePathMatcher {
    fn matching_paths(&self, patterns: &[Box<str>], paths: &[Box<str>]) -> Result<Vec<Box<str>>> {
        let matcher = compile(patterns)?;
        Ok(paths
            .iter()
            .filter(|path| is_match(&matcher, path))
            .cloned()
            .collect())
    }
}

fn compile(patterns: &[Box<str>]) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new("");
    for pattern in patterns {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            continue;
        }
        builder
            .add_line(None, trimmed)
            .map_err(|error| invalid_pattern(trimmed, &error))?;
    }
    builder.build().map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_pattern"),
            format!("failed to compile path patterns: {error}"),
        )
    })
}

fn is_match(matcher: &Gitignore, path: &str) -> bool {
    let normalized = normalize_path(path);
    if normalized.is_empty() {
        return false;
    }
    matcher
        .matched_path_or_any_parents(Path::new(normalized), false)
        .is_ignore()
}

// The gitignore engine rejects rooted paths.
fn normalize_path(path: &str) -> &str {
    let mut trimmed = path.trim();
    loop {
        let next = trimmed.trim_start_matches('/').trim_start_matches("./");
        if next.len() == trimmed.len() {
            return trimmed;
        }
        trimmed = next;
    }
}

fn invalid_pattern(pattern: &str, error: &ignore::Error) -> ErrorEnvelope {
    ErrorEnvelope::expected(
        ErrorCode::new("config", "invalid_pattern"),
        format!("invalid path pattern: {error}"),
    )
    .with_metadata("pattern", pattern.to_owned())
}
