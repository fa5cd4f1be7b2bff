//! Changed-file path matching boundary contract.

use prcheck_shared::Result;

/// Boundary contract for matching changed files against glob patterns.
///
/// Patterns use gitignore semantics. Implementations return a
/// `config`-namespaced error for invalid patterns.
pub trait PathMatcherPort: Send + Sync {
    /// Paths matched by at least one pattern, in input order.
    fn matching_paths(&self, patterns: &[Box<str>], paths: &[Box<str>]) -> Result<Vec<Box<str>>>;

    /// True when any path matches any pattern. False for an empty path list.
    fn any_match(&self, patterns: &[Box<str>], paths: &[Box<str>]) -> Result<bool> {
        Ok(!self.matching_paths(patterns, paths)?.is_empty())
    }

    /// True when every path matches some pattern. False for an empty path list.
    fn all_match(&self, patterns: &[Box<str>], paths: &[Box<str>]) -> Result<bool> {
        let matched = self.matching_paths(patterns, paths)?;
        Ok(!paths.is_empty() && matched.len() == paths.len())
    }
}
