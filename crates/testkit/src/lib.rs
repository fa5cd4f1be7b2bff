//! # prcheck-testkit
//!
//! Test helpers and in-memory adapters.
//! This crate depends on `domain`, `ports`, and `shared`.

pub mod errors;
pub mod in_memory;
pub mod snapshots;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prcheck_ports::ports_crate_version;
    use prcheck_shared::shared_crate_version;

    #[test]
    fn testkit_crate_compiles() {
        assert!(!testkit_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn error_fixtures_are_available() {
        let codes = errors::common_error_codes();
        assert!(!codes.is_empty());
    }

    #[test]
    fn in_memory_adapters_are_available() {
        let _ = in_memory::NoopLogger;
        let source = in_memory::InMemoryPullRequestSource::new(Vec::new());
        assert_eq!(source.list_calls(), 0);
    }
}
