//! # prcheck-app
//!
//! The `check` use case: fetch, filter, sort and collapse.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod check;
pub mod collapse;
pub mod path_filter;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use check::{
    CheckDeps, CheckInput, STAGE_FETCH_CHANGED_FILES, STAGE_FETCH_PULL_REQUESTS,
    STAGE_MATCH_PATHS, check,
};
pub use collapse::collapse;
pub use path_filter::{PathDecision, apply_path_policy};
