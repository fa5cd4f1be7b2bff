//! Changed-file policy applied to candidates when path filters are set.

use prcheck_domain::FilterPolicy;
use prcheck_ports::PathMatcherPort;
use prcheck_shared::Result;

/// Outcome of the path policy for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDecision {
    /// The candidate survives.
    Included,
    /// `paths` is set and no changed file matches it.
    NoMatchingPath,
    /// `ignore_paths` is set and every changed file matches it.
    OnlyIgnoredPaths,
    /// Every file matching `paths` also matches `ignore_paths`.
    NothingLeft,
}

impl PathDecision {
    /// Returns true when the candidate survives.
    #[must_use]
    pub const fn is_included(self) -> bool {
        matches!(self, Self::Included)
    }

    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Included => "included",
            Self::NoMatchingPath => "no_matching_path",
            Self::OnlyIgnoredPaths => "only_ignored_paths",
            Self::NothingLeft => "nothing_left",
        }
    }
}

/// Decide whether a candidate's changed files keep it in the result.
pub fn apply_path_policy(
    matcher: &dyn PathMatcherPort,
    policy: &FilterPolicy,
    files: &[Box<str>],
) -> Result<PathDecision> {
    let has_paths = !policy.paths.is_empty();
    let has_ignore_paths = !policy.ignore_paths.is_empty();

    if has_paths && !matcher.any_match(&policy.paths, files)? {
        return Ok(PathDecision::NoMatchingPath);
    }
    if has_ignore_paths && matcher.all_match(&policy.ignore_paths, files)? {
        return Ok(PathDecision::OnlyIgnoredPaths);
    }

    if has_paths && has_ignore_paths {
        let reduced = matcher.matching_paths(&policy.paths, files)?;
        if !reduced.is_empty() {
            let ignored = matcher.matching_paths(&policy.ignore_paths, &reduced)?;
            if ignored.len() == reduced.len() {
                return Ok(PathDecision::NothingLeft);
            }
        }
    }

    Ok(PathDecision::Included)
}
