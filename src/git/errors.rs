//! git::errors
//!
//! Error types for the command layer and the tables that classify git's
//! human-readable diagnostics.
//!
//! # Classification
//!
//! Git reports many expected situations ("no upstream configured", "not a
//! git repository") as failures. [`GitWarning`] lists the ones callers treat
//! as an empty success; [`KnownError`] lists failures that specific
//! operations recover from (bad revision, no merge base). Anything else is
//! unexpected and propagates.
//!
//! # Example
//!
//! ```
//! use gitscope::git::errors::{GitWarning, KnownError};
//!
//! assert_eq!(
//!     GitWarning::classify("fatal: no upstream configured for branch 'main'"),
//!     Some(GitWarning::NoUpstream)
//! );
//! assert_eq!(
//!     KnownError::BadRevision.capture("fatal: bad revision 'abc123^'").as_deref(),
//!     Some("abc123^")
//! );
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::forge::ForgeError;

/// A git process that could not be started or exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    /// The command line, for logs
    pub command: String,
    /// Exit code, when the process ran
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Set when the process could not be spawned
    pub spawn_error: Option<std::io::ErrorKind>,
    /// The task driving the process was torn down before it finished
    pub cancelled: bool,
}

impl RunError {
    pub fn exited(command: String, exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        Self {
            command,
            exit_code,
            stdout,
            stderr,
            spawn_error: None,
            cancelled: false,
        }
    }

    pub fn spawn(command: String, err: &std::io::Error) -> Self {
        Self {
            command,
            exit_code: None,
            stdout: String::new(),
            stderr: err.to_string(),
            spawn_error: Some(err.kind()),
            cancelled: false,
        }
    }

    pub fn cancelled(command: String) -> Self {
        Self {
            cancelled: true,
            ..Self::exited(command, None, String::new(), "git task was cancelled".into())
        }
    }

    /// The raw diagnostic: stderr, or stdout when git wrote nothing to stderr.
    pub fn message(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Diagnostic without `fatal: ` prefixes, one line.
    pub fn cleaned_message(&self) -> String {
        clean_message(self.message())
    }

    /// True when the executable or working directory does not exist.
    pub fn is_not_found(&self) -> bool {
        self.spawn_error == Some(std::io::ErrorKind::NotFound)
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cleaned_message())
    }
}

impl std::error::Error for RunError {}

/// Strip `fatal: ` and join lines with ` · ` for single-line logs.
pub fn clean_message(message: &str) -> String {
    message
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix("fatal: ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join(" · ")
}

/// Errors from git operations.
#[derive(Debug, Clone, Error)]
pub enum GitError {
    /// The process failed in a way nothing recovered from.
    #[error(transparent)]
    Run(#[from] RunError),

    /// The installed git is too old for the requested feature.
    #[error("{prefix} requires a newer version of Git (>= {required}) than is currently installed ({current}).{suffix}")]
    VersionRequirement {
        prefix: String,
        required: String,
        current: String,
        suffix: String,
    },

    /// `stash drop` target no longer points at the expected commit.
    #[error("stash {stash} is now {actual}, expected {expected}")]
    StashMismatch {
        stash: String,
        expected: String,
        actual: String,
    },

    /// The operation has no meaning for the working tree or index pseudo revision.
    #[error("cannot read uncommitted changes for '{path}'")]
    UncommittedRef { path: String },

    /// The caller stopped waiting.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The in-flight task was torn down before it produced a result.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// A path could not be mapped onto a repository.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Filesystem probe failed.
    #[error("io error: {0}")]
    Io(String),

    /// Remote provider failed.
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

impl GitError {
    /// The run error behind this error, if any.
    pub fn as_run(&self) -> Option<&RunError> {
        match self {
            GitError::Run(err) => Some(err),
            _ => None,
        }
    }

    /// Does the underlying diagnostic match a benign warning?
    pub fn warning(&self) -> Option<GitWarning> {
        self.as_run().and_then(|e| GitWarning::classify(e.message()))
    }

    /// Does the underlying diagnostic match `kind`?
    pub fn is(&self, kind: KnownError) -> bool {
        self.as_run().is_some_and(|e| kind.matches(e.message()))
    }
}

impl From<std::io::Error> for GitError {
    fn from(err: std::io::Error) -> Self {
        GitError::Io(err.to_string())
    }
}

/// Expected failures that resolve to an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitWarning {
    NotARepository,
    OutsideRepository,
    NoPath,
    NoCommits,
    NotFound,
    FoundButNotInRevision,
    HeadNotABranch,
    NoUpstream,
    UnknownRevision,
    MustRunInWorkTree,
    PatchWithConflicts,
    NoRemoteRepositorySpecified,
    RemoteConnectionError,
    NotAGitCommand,
}

static WARNINGS: LazyLock<Vec<(GitWarning, Regex)>> = LazyLock::new(|| {
    [
        (GitWarning::NotARepository, r"(?i)Not a git repository"),
        (GitWarning::OutsideRepository, r"(?i)is outside repository"),
        (GitWarning::NoPath, r"(?i)no such path"),
        (GitWarning::NoCommits, r"(?i)does not have any commits"),
        (GitWarning::NotFound, r"(?i)Path '.*?' does not exist in"),
        (
            GitWarning::FoundButNotInRevision,
            r"(?i)Path '.*?' exists on disk, but not in",
        ),
        (
            GitWarning::HeadNotABranch,
            r"(?i)HEAD does not point to a branch",
        ),
        (
            GitWarning::NoUpstream,
            r"(?i)no upstream configured for branch '(.*?)'",
        ),
        (
            GitWarning::UnknownRevision,
            r"(?i)ambiguous argument '.*?': unknown revision or path not in the working tree|not stored as a remote-tracking branch",
        ),
        (
            GitWarning::MustRunInWorkTree,
            r"(?i)this operation must be run in a work tree",
        ),
        (
            GitWarning::PatchWithConflicts,
            r"(?i)Applied patch to '.*?' with conflicts",
        ),
        (
            GitWarning::NoRemoteRepositorySpecified,
            r"(?i)No remote repository specified\.",
        ),
        (
            GitWarning::RemoteConnectionError,
            r"(?i)Could not read from remote repository",
        ),
        (GitWarning::NotAGitCommand, r"(?i)'.+' is not a git command"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("warning pattern compiles")))
    .collect()
});

impl GitWarning {
    /// First warning whose pattern matches `message`.
    pub fn classify(message: &str) -> Option<GitWarning> {
        WARNINGS
            .iter()
            .find(|(_, re)| re.is_match(message))
            .map(|(kind, _)| *kind)
    }

    pub fn matches(self, message: &str) -> bool {
        WARNINGS
            .iter()
            .any(|(kind, re)| *kind == self && re.is_match(message))
    }
}

/// Failures specific operations recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownError {
    BadRevision,
    NoFastForward,
    NoMergeBase,
    NotAValidObjectName,
    InvalidLineCount,
}

static KNOWN_ERRORS: LazyLock<Vec<(KnownError, Regex)>> = LazyLock::new(|| {
    [
        (KnownError::BadRevision, r"(?i)bad revision '(.*?)'"),
        (KnownError::NoFastForward, r"(?i)\(non-fast-forward\)"),
        (KnownError::NoMergeBase, r"(?i)no merge base"),
        (KnownError::NotAValidObjectName, r"(?i)Not a valid object name"),
        (KnownError::InvalidLineCount, r"(?i)file .+? has only \d+ lines"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("error pattern compiles")))
    .collect()
});

impl KnownError {
    fn regex(self) -> Option<&'static Regex> {
        KNOWN_ERRORS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, re)| re)
    }

    pub fn matches(self, message: &str) -> bool {
        self.regex().is_some_and(|re| re.is_match(message))
    }

    /// First capture group, e.g. the revision named by `bad revision '<rev>'`.
    pub fn capture(self, message: &str) -> Option<String> {
        self.regex()
            .and_then(|re| re.captures(message))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_warnings() {
        let cases = [
            (
                "fatal: not a git repository (or any of the parent directories): .git",
                GitWarning::NotARepository,
            ),
            (
                "fatal: ambiguous argument 'nope': unknown revision or path not in the working tree.",
                GitWarning::UnknownRevision,
            ),
            (
                "fatal: HEAD does not point to a branch",
                GitWarning::HeadNotABranch,
            ),
            (
                "fatal: this operation must be run in a work tree",
                GitWarning::MustRunInWorkTree,
            ),
            (
                "git: 'frobnicate' is not a git command. See 'git --help'.",
                GitWarning::NotAGitCommand,
            ),
            (
                "fatal: Path 'x.txt' exists on disk, but not in 'HEAD'",
                GitWarning::FoundButNotInRevision,
            ),
        ];

        for (message, expected) in cases {
            assert_eq!(GitWarning::classify(message), Some(expected), "{}", message);
        }
    }

    #[test]
    fn unexpected_is_unclassified() {
        assert_eq!(GitWarning::classify("fatal: unable to write new index file"), None);
    }

    #[test]
    fn known_errors() {
        assert!(KnownError::NoMergeBase.matches("fatal: no merge base found"));
        assert!(KnownError::InvalidLineCount.matches("fatal: file foo.rs has only 3 lines"));
        assert!(!KnownError::BadRevision.matches("fatal: no merge base found"));
        assert_eq!(KnownError::NoMergeBase.capture("no merge base"), None);
    }

    #[test]
    fn clean_message_joins_lines() {
        assert_eq!(
            clean_message("fatal: first\n\nsecond line\n"),
            "first · second line"
        );
    }

    #[test]
    fn run_error_prefers_stderr() {
        let err = RunError::exited(
            "git status".to_string(),
            Some(128),
            "out".to_string(),
            "fatal: broken".to_string(),
        );
        assert_eq!(err.message(), "fatal: broken");
        assert_eq!(err.to_string(), "broken");

        let err = RunError::exited("git diff".to_string(), Some(1), "diff output".to_string(), String::new());
        assert_eq!(err.message(), "diff output");
    }

    #[test]
    fn git_error_helpers() {
        let err = GitError::Run(RunError::exited(
            "git diff".to_string(),
            Some(128),
            String::new(),
            "fatal: bad revision 'abc^'".to_string(),
        ));
        assert!(err.is(KnownError::BadRevision));
        assert_eq!(err.warning(), None);
        assert!(!GitError::Timeout(Duration::from_secs(1)).is(KnownError::BadRevision));
    }
}
