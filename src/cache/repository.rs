//! cache::repository
//!
//! Repository-scoped secondary caches and their invalidation table.
//!
//! # Invalidation
//!
//! | change                      | drops                                  |
//! |-----------------------------|----------------------------------------|
//! | `Config`                    | current user                           |
//! | `Heads`, `Remotes`          | branches, contributors (plain + stats) |
//! | `Remotes`, `RemoteProviders`| rich remote providers (all repos)      |
//! | `Index`, `Unknown`          | tracked-file existence (all repos)     |
//! | `Merge`                     | merge status                           |
//! | `Rebase`                    | rebase status                          |
//! | `Stash`                     | stash                                  |
//! | `Tags`                      | tags                                   |
//!
//! Nothing is flushed globally except by [`RepositoryCaches::reset`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use super::entry::CacheSlots;
use crate::core::paths::normalize_path;
use crate::forge::ProviderRemote;
use crate::models::{Branch, Contributor, MergeStatus, RebaseStatus, Stash, Tag, User};

/// Category of a repository change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RepositoryChange {
    Config,
    Heads,
    Index,
    Merge,
    Rebase,
    Remotes,
    RemoteProviders,
    Stash,
    Tags,
    Closed,
    Unknown,
}

/// A batch of changes observed in one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryChangeEvent {
    pub repo_path: String,
    pub changes: Vec<RepositoryChange>,
}

impl RepositoryChangeEvent {
    pub fn new(repo_path: &str, changes: impl IntoIterator<Item = RepositoryChange>) -> Self {
        Self {
            repo_path: normalize_path(repo_path),
            changes: changes.into_iter().collect(),
        }
    }

    /// True if any of `kinds` changed.
    pub fn changed(&self, kinds: &[RepositoryChange]) -> bool {
        kinds.iter().any(|k| self.changes.contains(k))
    }
}

/// Caches that [`RepositoryCaches::reset`] can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Branches,
    Contributors,
    Providers,
    Remotes,
    Stashes,
    Status,
    Tags,
}

impl std::str::FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "branches" => Ok(CacheKind::Branches),
            "contributors" => Ok(CacheKind::Contributors),
            "providers" => Ok(CacheKind::Providers),
            "remotes" => Ok(CacheKind::Remotes),
            "stashes" => Ok(CacheKind::Stashes),
            "status" => Ok(CacheKind::Status),
            "tags" => Ok(CacheKind::Tags),
            other => Err(format!("unknown cache '{}'", other)),
        }
    }
}

/// Key of the contributors cache; stats are cached apart.
pub fn contributors_key(repo_path: &str, stats: bool) -> String {
    if stats {
        format!("stats|{}", repo_path)
    } else {
        repo_path.to_string()
    }
}

/// Caches keyed by repository path, owned by the service.
#[derive(Debug, Clone)]
pub struct RepositoryCaches {
    pub branches: CacheSlots<Vec<Branch>>,
    pub contributors: CacheSlots<Vec<Contributor>>,
    pub merge_status: CacheSlots<MergeStatus>,
    pub rebase_status: CacheSlots<RebaseStatus>,
    pub stashes: CacheSlots<Stash>,
    pub tags: CacheSlots<Vec<Tag>>,
    pub tracked: CacheSlots<bool>,
    pub users: CacheSlots<User>,
    pub providers: CacheSlots<ProviderRemote>,
    /// Connection state per provider key, kept apart from provider identity
    connected: Arc<Mutex<HashMap<String, bool>>>,
}

impl Default for RepositoryCaches {
    fn default() -> Self {
        Self {
            branches: CacheSlots::new("branches"),
            contributors: CacheSlots::new("contributors"),
            merge_status: CacheSlots::new("merge status"),
            rebase_status: CacheSlots::new("rebase status"),
            stashes: CacheSlots::new("stash"),
            tags: CacheSlots::new("tags"),
            tracked: CacheSlots::new("tracked"),
            users: CacheSlots::new("user"),
            providers: CacheSlots::new("providers"),
            connected: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl RepositoryCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the invalidation table to one event.
    pub fn on_repository_changed(&self, event: &RepositoryChangeEvent) {
        use RepositoryChange::*;
        let repo = event.repo_path.as_str();

        if event.changed(&[Config]) {
            self.users.remove(repo);
        }
        if event.changed(&[Heads, Remotes]) {
            self.branches.remove(repo);
            self.contributors.remove(&contributors_key(repo, false));
            self.contributors.remove(&contributors_key(repo, true));
        }
        if event.changed(&[Remotes, RemoteProviders]) {
            self.providers.clear();
            self.clear_connections();
        }
        if event.changed(&[Index, Unknown]) {
            self.tracked.clear();
        }
        if event.changed(&[Merge]) {
            self.merge_status.remove(repo);
        }
        if event.changed(&[Rebase]) {
            self.rebase_status.remove(repo);
        }
        if event.changed(&[Stash]) {
            self.stashes.remove(repo);
        }
        if event.changed(&[Tags]) {
            self.tags.remove(repo);
        }
    }

    /// Clear the named caches, or all of them when `kinds` is empty.
    pub fn reset(&self, kinds: &[CacheKind]) {
        let all = kinds.is_empty();
        let wants = |kind| all || kinds.contains(&kind);
        debug!("resetting caches {:?}", kinds);

        if wants(CacheKind::Branches) {
            self.branches.clear();
        }
        if wants(CacheKind::Contributors) {
            self.contributors.clear();
        }
        if wants(CacheKind::Providers) {
            self.providers.clear();
            self.clear_connections();
        }
        if wants(CacheKind::Stashes) {
            self.stashes.clear();
        }
        if wants(CacheKind::Status) {
            self.merge_status.clear();
            self.rebase_status.clear();
        }
        if wants(CacheKind::Tags) {
            self.tags.clear();
        }
        if all {
            self.tracked.clear();
            self.users.clear();
        }
    }

    /// Contributors caches depend on the show-all-branches setting.
    pub fn on_settings_changed(&self) {
        self.contributors.clear();
    }

    pub fn is_connected(&self, key: &str) -> Option<bool> {
        self.connected.lock().ok().and_then(|c| c.get(key).copied())
    }

    pub fn set_connected(&self, key: &str, connected: bool) {
        if let Ok(mut c) = self.connected.lock() {
            c.insert(key.to_string(), connected);
        }
    }

    fn clear_connections(&self) {
        if let Ok(mut c) = self.connected.lock() {
            c.clear();
        }
    }
}
