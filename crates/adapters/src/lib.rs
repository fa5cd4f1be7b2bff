//! # prcheck-adapters
//!
//! Adapter implementations for ports: the GitHub GraphQL pull request
//! source, the gitignore-style path matcher, and structured loggers.
//! This crate depends on `ports`, `config`, `domain`, and `shared`.

pub mod github;
pub mod log_sink;
pub mod logger;
pub mod paths;

pub use github::{DEFAULT_GRAPHQL_ENDPOINT, GitHubPullRequestSource, GitHubSourceConfig};
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::{JsonLogger, TracingLogger};
pub use paths::GitignorePathMatcher;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
