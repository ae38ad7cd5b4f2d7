//! models::refs
//!
//! Branches, tags and remotes.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tracking information of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upstream {
    /// Short name, e.g. `origin/main`
    pub name: String,
    /// The upstream ref no longer exists (`[gone]`)
    pub missing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Branch {
    pub repo_path: String,
    /// Short name (`main`, `origin/main`)
    pub name: String,
    pub remote: bool,
    pub current: bool,
    pub sha: Option<String>,
    pub upstream: Option<Upstream>,
    pub ahead: u32,
    pub behind: u32,
    pub date: Option<DateTime<Utc>>,
    pub detached: bool,
    pub rebasing: bool,
}

impl Branch {
    /// Remote name of a remote branch (`origin` for `origin/main`).
    pub fn remote_name(&self) -> Option<&str> {
        if !self.remote {
            return None;
        }
        self.name.split('/').next()
    }

    /// Name without the remote prefix.
    pub fn base_name(&self) -> &str {
        if self.remote {
            self.name
                .split_once('/')
                .map(|(_, rest)| rest)
                .unwrap_or(&self.name)
        } else {
            &self.name
        }
    }

    /// Description for a detached HEAD, `(HEAD detached at 1a2b3c4)`.
    pub fn detached_name(sha: &str) -> String {
        format!(
            "(HEAD detached at {})",
            crate::core::types::rev::shorten(sha)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub repo_path: String,
    pub name: String,
    /// Tag object (annotated) or commit (lightweight)
    pub sha: String,
    /// Peeled commit of an annotated tag
    pub commit_sha: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub message: String,
}

impl Tag {
    /// Commit the tag points at.
    pub fn target(&self) -> &str {
        self.commit_sha.as_deref().unwrap_or(&self.sha)
    }
}

/// Direction a remote URL is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RemoteUrlKind {
    Fetch,
    Push,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteUrl {
    pub url: String,
    pub kind: RemoteUrlKind,
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub repo_path: String,
    pub name: String,
    /// Scheme as written (`https://`, `ssh://`, or empty for scp-like urls)
    pub scheme: String,
    pub domain: String,
    /// `owner/repo`
    pub path: String,
    pub urls: Vec<RemoteUrl>,
}

impl Remote {
    pub fn fetch_url(&self) -> Option<&str> {
        self.urls
            .iter()
            .find(|u| u.kind == RemoteUrlKind::Fetch)
            .map(|u| u.url.as_str())
    }

    pub fn push_url(&self) -> Option<&str> {
        self.urls
            .iter()
            .find(|u| u.kind == RemoteUrlKind::Push)
            .map(|u| u.url.as_str())
    }
}

/// Ahead/behind counts from `rev-list --left-right --count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(name: &str, remote: bool) -> Branch {
        Branch {
            repo_path: "/r".to_string(),
            name: name.to_string(),
            remote,
            current: false,
            sha: None,
            upstream: None,
            ahead: 0,
            behind: 0,
            date: None,
            detached: false,
            rebasing: false,
        }
    }

    #[test]
    fn remote_branch_names() {
        let b = branch("origin/feature/x", true);
        assert_eq!(b.remote_name(), Some("origin"));
        assert_eq!(b.base_name(), "feature/x");

        let local = branch("feature/x", false);
        assert_eq!(local.remote_name(), None);
        assert_eq!(local.base_name(), "feature/x");
    }

    #[test]
    fn detached_description() {
        assert_eq!(
            Branch::detached_name("4b825dc642cb6eb9a060e54bf8d69288fbee4904"),
            "(HEAD detached at 4b825dc)"
        );
    }
}
