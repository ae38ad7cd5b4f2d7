//! models::repository
//!
//! Repository-level records: tree entries, contributors, the current user,
//! and in-progress merge or rebase state.

use serde::Serialize;

/// Object kind in `ls-tree` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
}

impl TreeEntryKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "blob" => Some(TreeEntryKind::Blob),
            "tree" => Some(TreeEntryKind::Tree),
            "commit" => Some(TreeEntryKind::Commit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    pub kind: TreeEntryKind,
    pub sha: String,
    /// Absent for trees and submodules
    pub size: Option<u64>,
}

/// Someone who committed to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub repo_path: String,
    pub name: String,
    pub email: String,
    pub commits: u32,
    pub additions: Option<u32>,
    pub deletions: Option<u32>,
    pub files: Option<u32>,
    /// The configured user
    pub current: bool,
}

/// Identity from `user.name` / `user.email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    pub fn matches(&self, name: &str, email: &str) -> bool {
        let email_match = self
            .email
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(email));
        let name_match = self.name.as_deref() == Some(name);
        email_match || (self.email.is_none() && name_match)
    }
}

/// A side of a merge or rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRef {
    pub sha: String,
    /// Branch name pointing at `sha`, when known
    pub name: Option<String>,
}

/// In-progress merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStatus {
    pub repo_path: String,
    pub head: StateRef,
    pub incoming: StateRef,
    pub merge_base: Option<String>,
}

/// In-progress rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebaseStatus {
    pub repo_path: String,
    /// Branch being rebased (without `refs/heads/`)
    pub head_name: String,
    pub onto: StateRef,
    pub merge_base: Option<String>,
    /// 1-based step in progress
    pub step: Option<u32>,
    pub steps: Option<u32>,
    /// Message of the commit being applied
    pub message: Option<String>,
}
