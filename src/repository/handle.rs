//! repository::handle
//!
//! A live repository: its root, the workspace it was found from and the
//! per-repository caches that do not live in the service.
//!
//! # Lifecycle
//!
//! ```text
//! Discovered ──► Active ──► Closed
//!   (new)      (registry)   (close / removal)
//! ```
//!
//! A closed handle keeps answering lookups from callers that still hold it,
//! but its caches are emptied and it is never handed out again.

use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheSlots, RepositoryChange, RepositoryChangeEvent};
use crate::core::paths::normalize_path;
use crate::models::{Branch, Remote};

const BRANCH_KEY: &str = "branch";
const REMOTES_KEY: &str = "remotes";

/// Where a repository is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepositoryState {
    /// Toplevel resolved, not yet registered
    Discovered,
    Active,
    Closed,
}

/// Handle for one working tree.
#[derive(Debug)]
pub struct Repository {
    path: String,
    name: String,
    workspace: Option<String>,
    state: Mutex<RepositoryState>,
    /// Current branch, under a single key
    pub branch: CacheSlots<Branch>,
    /// Configured remotes, under a single key
    pub remotes: CacheSlots<Vec<Remote>>,
}

impl Repository {
    /// A discovered repository rooted at `path`.
    pub fn new(path: &str, workspace: Option<&str>) -> Self {
        let path = normalize_path(path);
        let name = path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(path.as_str())
            .to_string();

        Self {
            name,
            workspace: workspace.map(normalize_path),
            state: Mutex::new(RepositoryState::Discovered),
            branch: CacheSlots::new("repository branch"),
            remotes: CacheSlots::new("repository remotes"),
            path,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root of the workspace folder this repository was found from.
    pub fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    pub fn state(&self) -> RepositoryState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.state() == RepositoryState::Closed
    }

    pub(super) fn activate(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == RepositoryState::Discovered {
            *state = RepositoryState::Active;
        }
    }

    /// Mark closed and drop cached state.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != RepositoryState::Closed {
            debug!("closing repository {}", self.path);
            *state = RepositoryState::Closed;
            drop(state);
            self.reset_caches();
        }
    }

    pub fn reset_caches(&self) {
        self.branch.clear();
        self.remotes.clear();
    }

    /// Drop caches made stale by `event`.
    pub fn on_changed(&self, event: &RepositoryChangeEvent) {
        if event.repo_path != self.path {
            return;
        }
        if event.changed(&[RepositoryChange::Closed]) {
            self.close();
            return;
        }
        if event.changed(&[RepositoryChange::Heads, RepositoryChange::Unknown]) {
            self.branch.remove(BRANCH_KEY);
        }
        if event.changed(&[RepositoryChange::Remotes, RepositoryChange::Unknown]) {
            self.remotes.remove(REMOTES_KEY);
        }
    }

    pub fn branch_key() -> &'static str {
        BRANCH_KEY
    }

    pub fn remotes_key() -> &'static str {
        REMOTES_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;

    #[test]
    fn new_normalizes_and_names() {
        let repo = Repository::new("/work/my-app/", Some("/work/"));
        assert_eq!(repo.path(), "/work/my-app");
        assert_eq!(repo.name(), "my-app");
        assert_eq!(repo.workspace(), Some("/work"));
        assert_eq!(repo.state(), RepositoryState::Discovered);
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let repo = Repository::new("/r", None);
        repo.activate();
        assert_eq!(repo.state(), RepositoryState::Active);
        repo.close();
        repo.activate();
        assert!(repo.is_closed());
    }

    #[test]
    fn change_events_drop_matching_caches() {
        let repo = Repository::new("/r", None);
        repo.remotes
            .set(Repository::remotes_key(), CacheEntry::resolved(Vec::new()));

        repo.on_changed(&RepositoryChangeEvent::new("/other", [RepositoryChange::Remotes]));
        assert_eq!(repo.remotes.len(), 1);

        repo.on_changed(&RepositoryChangeEvent::new("/r", [RepositoryChange::Heads]));
        assert_eq!(repo.remotes.len(), 1);

        repo.on_changed(&RepositoryChangeEvent::new("/r", [RepositoryChange::Remotes]));
        assert!(repo.remotes.is_empty());
    }

    #[test]
    fn closed_event_closes() {
        let repo = Repository::new("/r", None);
        repo.on_changed(&RepositoryChangeEvent::new("/r/", [RepositoryChange::Closed]));
        assert!(repo.is_closed());
    }
}
