//! git::builders
//!
//! Pure functions from operation parameters to [`GitCommand`]s.
//!
//! # Design
//!
//! Each operation has one builder and, where it takes more than a couple of
//! inputs, one explicit argument struct. Builders never touch the process
//! layer or the filesystem; facts they need about the environment (the
//! installed git version, whether an ignore-revs file exists) are passed in.
//! Format strings come from [`crate::parsers::format`] so that builder and
//! parser cannot drift apart.
//!
//! Version-gated flags are omitted, not sent, when the installed git is too
//! old. Operations that cannot be expressed without the newer feature return
//! [`GitError::VersionRequirement`] instead.
//!
//! [`GitError::VersionRequirement`]: crate::git::GitError::VersionRequirement

mod history;
mod refs;
mod worktree;

pub use history::*;
pub use refs::*;
pub use worktree::*;

/// Longest combined argument list sent on the command line.
pub const MAX_ARGS_LENGTH: usize = 30_000;

/// `-M` or `-M<n>%`.
pub(crate) fn find_renames(similarity: Option<u8>) -> String {
    match similarity {
        Some(n) => format!("-M{}%", n),
        None => "-M".to_string(),
    }
}

/// `--<ordering>-order`, when an ordering is configured.
pub(crate) fn ordering(ordering: Option<&str>) -> Option<String> {
    ordering
        .filter(|o| !o.is_empty())
        .map(|o| format!("--{}-order", o))
}

/// `--diff-filter=<letters>`, when any are given.
pub(crate) fn diff_filter(filters: &str) -> Option<String> {
    (!filters.is_empty()).then(|| format!("--diff-filter={}", filters))
}
