//! models::status
//!
//! Working tree status, stashes and the reflog.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::commit::{CommitFile, FileStatus};

/// One path in `git status` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusFile {
    pub path: String,
    pub original_path: Option<String>,
    /// `X` column; `None` when unchanged in the index
    pub index_status: Option<FileStatus>,
    /// `Y` column; `None` when unchanged in the working tree
    pub working_tree_status: Option<FileStatus>,
    pub conflicted: bool,
}

impl StatusFile {
    pub fn staged(&self) -> bool {
        self.index_status.is_some()
            && self.index_status != Some(FileStatus::Untracked)
            && self.index_status != Some(FileStatus::Ignored)
    }

    /// The most significant status for display.
    pub fn status(&self) -> FileStatus {
        if self.conflicted {
            return FileStatus::Unmerged;
        }
        self.working_tree_status
            .or(self.index_status)
            .unwrap_or(FileStatus::Unknown)
    }
}

/// Repository status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    pub repo_path: String,
    /// Current branch; `None` when detached
    pub branch: Option<String>,
    pub sha: Option<String>,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub files: Vec<StatusFile>,
}

impl RepoStatus {
    pub fn file(&self, path: &str) -> Option<&StatusFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn has_conflicts(&self) -> bool {
        self.files.iter().any(|f| f.conflicted)
    }
}

/// One `stash@{n}` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StashEntry {
    pub repo_path: String,
    /// `stash@{0}`
    pub stash_name: String,
    pub sha: String,
    pub date: Option<DateTime<Utc>>,
    pub committer_date: Option<DateTime<Utc>>,
    pub message: String,
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stash {
    pub repo_path: String,
    pub entries: Vec<StashEntry>,
}

impl Stash {
    pub fn find(&self, sha: &str) -> Option<&StashEntry> {
        self.entries.iter().find(|e| e.sha == sha)
    }
}

/// A reflog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReflogRecord {
    pub sha: String,
    /// `HEAD` or the branch the entry belongs to
    pub selector: String,
    /// Date as printed inside `@{...}`
    pub date: String,
    /// `merge`, `pull`, `commit`, ...
    pub command: String,
    /// Text between the command and the colon, e.g. ` origin main` or ` (amend)`
    pub command_args: String,
    pub details: String,
}

/// A page of reflog entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reflog {
    pub repo_path: String,
    pub records: Vec<ReflogRecord>,
    /// Raw entries read, including filtered ones; the next page skips these
    pub total: usize,
    pub limit: usize,
    pub has_more: bool,
}
