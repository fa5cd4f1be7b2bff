//! Sort and collapse of resolved versions.

use prcheck_domain::{Version, sort_chronologically};

/// Order versions oldest first and collapse them against the previous one.
///
/// - nothing new with a previous version: the previous version alone;
/// - anything new without a previous version: only the newest;
/// - otherwise the full sorted list.
#[must_use]
pub fn collapse(mut versions: Vec<Version>, previous: Option<Version>) -> Vec<Version> {
    sort_chronologically(&mut versions);
    match previous {
        Some(previous) if versions.is_empty() => vec![previous],
        Some(_) => versions,
        None => versions.pop().into_iter().collect(),
    }
}
