//! Shell-style glob matching for include/exclude rules.
//!
//! A pattern without a `/` matches the file name only (`*.jpg` matches
//! `photos/a.jpg`); a pattern with a `/` matches the whole relative path.

use gix::glob::wildmatch;

/// Match one pattern against a slash-separated relative path.
pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.trim_start_matches('/');
    let target = if pattern.contains('/') {
        path
    } else {
        path.rsplit_once('/').map_or(path, |(_, name)| name)
    };

    wildmatch(
        pattern.into(),
        target.into(),
        wildmatch::Mode::NO_MATCH_SLASH_LITERAL,
    )
}

/// Whether any pattern in the list matches.
pub fn any_match<S: AsRef<str>>(patterns: &[S], path: &str) -> bool {
    patterns.iter().any(|p| matches(p.as_ref(), path))
}
