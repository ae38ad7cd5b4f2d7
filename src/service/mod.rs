//! service
//!
//! The façade: one long-lived [`GitService`] owning the executor, the
//! repository registry and every cache.
//!
//! # Architecture
//!
//! ```text
//! caller ──► GitService ──► cache hit ─────────────────────────► result
//!                 │
//!                 └─ miss ──► builders ──► Git (dedup) ──► parsers ──► cache
//! ```
//!
//! Each request resolves the owning repository first (registry lookup, then
//! `rev-parse --show-toplevel`), then consults the document or repository
//! cache. On a miss the computation itself is stored before it runs, so
//! concurrent callers share it. Failures are logged and reported as `None`
//! or an empty list; the caches keep an empty sentinel so a failing call is
//! not repeated until its repository changes.
//!
//! # Lifecycle
//!
//! [`GitService::init`] locates git; [`GitService::shutdown`] closes every
//! repository and drops all cached state. The handle is cheap to clone and
//! every clone shares the same state.
//!
//! # Modules
//!
//! - [`settings`] - Tunables consumed per call
//! - `documents` - Blame, diff and status of single files
//! - `history` - Repository and file logs, search, paging, reflog
//! - `refs` - Branches, tags, stash, contributors, merge and rebase state
//! - `remotes` - Remotes, rich providers and pull request lookups
//!
//! # Example
//!
//! ```ignore
//! use gitscope::service::{GitService, ServiceSettings};
//!
//! let service = GitService::init(ServiceSettings::default()).await?;
//! service.discover("/work").await?;
//! if let Some(blame) = service.blame_for_file("/work/app/src/main.rs", None).await {
//!     println!("{} authors", blame.authors.len());
//! }
//! service.shutdown();
//! ```

mod documents;
mod history;
mod refs;
mod remotes;
pub mod settings;

pub use crate::models::SearchPattern;
pub use history::{FileLogOptions, LogOptions, ReflogOptions};
pub use settings::ServiceSettings;

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{
    CacheKind, CacheSlots, Cached, DocumentTracker, RepositoryCaches, RepositoryChange,
    RepositoryChangeEvent,
};
use crate::core::paths::{self, join, normalize_path, split_path};
use crate::core::types::rev;
use crate::forge::ProviderFactory;
use crate::git::{builders, Git, GitError};
use crate::repository::{repository_search, Repository, RepositoryRegistry};

/// Entry point for every git query.
#[derive(Clone)]
pub struct GitService {
    git: Git,
    settings: Arc<RwLock<ServiceSettings>>,
    documents: DocumentTracker,
    caches: RepositoryCaches,
    registry: RepositoryRegistry,
    /// Workspace folders handed to [`discover`](Self::discover)
    workspaces: Arc<Mutex<Vec<String>>>,
    providers: Option<Arc<dyn ProviderFactory>>,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for GitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitService")
            .field("git", &self.git)
            .field("repositories", &self.registry.len())
            .field("documents", &self.documents.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl GitService {
    /// Service over an existing executor.
    pub fn new(git: Git, settings: ServiceSettings) -> Self {
        Self {
            git,
            settings: Arc::new(RwLock::new(settings)),
            documents: DocumentTracker::new(),
            caches: RepositoryCaches::new(),
            registry: RepositoryRegistry::new(),
            workspaces: Arc::new(Mutex::new(Vec::new())),
            providers: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Locate git from `settings.git_path` and start the service.
    pub async fn init(settings: ServiceSettings) -> Result<Self, GitError> {
        let git = Git::locate_default(Some(&settings.git_path)).await?;
        info!("git service started with git {}", git.version());
        Ok(Self::new(git, settings))
    }

    /// Register the factory that builds rich remote providers.
    pub fn with_provider_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.providers = Some(factory);
        self
    }

    /// Close every repository and drop all cached state.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("git service shutting down");
        self.registry.clear();
        self.documents.reset_all();
        self.caches.reset(&[]);
        self.lock_workspaces().clear();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    pub fn documents(&self) -> &DocumentTracker {
        &self.documents
    }

    pub fn caches(&self) -> &RepositoryCaches {
        &self.caches
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> ServiceSettings {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the settings, dropping results they shaped.
    pub fn update_settings(&self, settings: ServiceSettings) {
        let previous = {
            let mut current = self.settings.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *current, settings.clone())
        };

        if previous.show_all_branches != settings.show_all_branches {
            self.caches.on_settings_changed();
        }
        if previous.caching_enabled != settings.caching_enabled
            || previous.blame_ignore_whitespace != settings.blame_ignore_whitespace
            || previous.blame_custom_arguments != settings.blame_custom_arguments
            || previous.similarity_threshold != settings.similarity_threshold
            || previous.follow_renames != settings.follow_renames
        {
            debug!("settings changed; resetting document caches");
            self.documents.reset_all();
        }
        if previous.default_remote != settings.default_remote {
            self.caches.reset(&[CacheKind::Providers]);
        }
    }

    fn lock_workspaces(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.workspaces.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `producer` through `slots`, or directly when caching is off.
    async fn cached<T, F, Fut>(&self, slots: &CacheSlots<T>, key: &str, producer: F) -> Cached<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, GitError>> + Send + 'static,
    {
        if self.settings().caching_enabled {
            return slots.get_or_compute(key, producer).await;
        }
        match producer().await {
            Ok(value) => value.map(Arc::new),
            Err(err) => {
                debug!("'{}' failed: {}", key, err);
                None
            }
        }
    }

    /// Like [`cached`](Self::cached), but an empty result is not kept.
    async fn cached_or_retry<T, F, Fut>(
        &self,
        slots: &CacheSlots<T>,
        key: &str,
        producer: F,
    ) -> Cached<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, GitError>> + Send + 'static,
    {
        let value = self.cached(slots, key, producer).await;
        if value.is_none() {
            slots.remove(key);
        }
        value
    }

    // ========================================================================
    // Repositories
    // ========================================================================

    /// Root of the repository containing `path`, registering it on first sight.
    pub async fn get_repo_path(
        &self,
        path: &str,
        is_directory: bool,
    ) -> Result<Option<String>, GitError> {
        let path = normalize_path(path);
        if let Some(repository) = self.registry.find(&path) {
            return Ok(Some(repository.path().to_string()));
        }

        let dir = if is_directory {
            path.clone()
        } else {
            Path::new(&path)
                .parent()
                .map(paths::normalize)
                .unwrap_or_else(|| path.clone())
        };

        let Some(toplevel) = self.git.show_toplevel(&dir).await? else {
            debug!("{} is not in a repository", path);
            return Ok(None);
        };
        if let Some(repository) = self.registry.get(&toplevel) {
            return Ok(Some(repository.path().to_string()));
        }

        let workspace = self.workspace_for(&toplevel);
        let repository = self
            .registry
            .insert(Repository::new(&toplevel, workspace.as_deref()));
        info!("repository found at {}", repository.path());
        Ok(Some(repository.path().to_string()))
    }

    /// Registered repository owning `path`, without touching git.
    pub fn find_repository(&self, path: &str) -> Option<Arc<Repository>> {
        self.registry.find(path)
    }

    /// Repository owning `path`, resolving and registering it if needed.
    pub async fn repository(&self, path: &str) -> Option<Arc<Repository>> {
        match self.get_repo_path(path, false).await {
            Ok(Some(root)) => self.registry.get(&root),
            Ok(None) => None,
            Err(err) => {
                warn!("could not resolve the repository of {}: {}", path, err);
                None
            }
        }
    }

    /// `(repository root, relative path)` of a file.
    pub(crate) async fn locate(&self, path: &str) -> Option<(String, String)> {
        let root = match self.get_repo_path(path, false).await {
            Ok(root) => root?,
            Err(err) => {
                warn!("could not resolve the repository of {}: {}", path, err);
                return None;
            }
        };
        let (file, root) = split_path(path, Some(&root));
        Some((root, file))
    }

    fn workspace_for(&self, path: &str) -> Option<String> {
        self.lock_workspaces()
            .iter()
            .filter(|ws| path == ws.as_str() || path.starts_with(&format!("{}/", ws)))
            .max_by_key(|ws| ws.len())
            .cloned()
    }

    /// Find and register every repository in a workspace folder.
    pub async fn discover(&self, folder: &str) -> Result<Vec<Arc<Repository>>, GitError> {
        let folder = normalize_path(folder);
        {
            let mut workspaces = self.lock_workspaces();
            if !workspaces.contains(&folder) {
                workspaces.push(folder.clone());
            }
        }

        let settings = self.settings();
        let roots = repository_search(
            &self.git,
            &folder,
            settings.search_depth,
            &settings.search_excludes,
        )
        .await?;

        let repositories: Vec<Arc<Repository>> = roots
            .iter()
            .map(|root| self.registry.insert(Repository::new(root, Some(&folder))))
            .collect();
        info!(
            "found {} repositories in {}",
            repositories.len(),
            folder
        );
        Ok(repositories)
    }

    /// Forget a workspace folder and close the repositories found from it.
    pub fn remove_workspace(&self, folder: &str) -> Vec<Arc<Repository>> {
        let folder = normalize_path(folder);
        self.lock_workspaces().retain(|ws| *ws != folder);

        let removed = self.registry.remove_workspace(&folder);
        for repository in &removed {
            self.forget_repository(repository.path());
        }
        removed
    }

    fn forget_repository(&self, repo_path: &str) {
        use RepositoryChange::*;
        self.documents.remove_repository(repo_path);
        self.caches.on_repository_changed(&RepositoryChangeEvent::new(
            repo_path,
            [Config, Heads, Index, Merge, Rebase, Remotes, Stash, Tags],
        ));
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Drop everything made stale by `event`.
    pub fn on_repository_changed(&self, event: &RepositoryChangeEvent) {
        use RepositoryChange::*;
        debug!("repository changed: {} {:?}", event.repo_path, event.changes);

        self.caches.on_repository_changed(event);
        if let Some(repository) = self.registry.get(&event.repo_path) {
            repository.on_changed(event);
        }

        if event.changed(&[Closed]) {
            self.registry.remove(&event.repo_path);
            self.forget_repository(&event.repo_path);
            return;
        }
        if event.changed(&[Heads, Index, Unknown]) {
            self.documents.reset_repository(&event.repo_path);
        }
    }

    /// Clear the named caches, or everything when `kinds` is empty.
    pub fn reset_caches(&self, kinds: &[CacheKind]) {
        self.caches.reset(kinds);

        let all = kinds.is_empty();
        for repository in self.registry.repositories() {
            if all {
                repository.reset_caches();
                continue;
            }
            if kinds.contains(&CacheKind::Branches) {
                repository.branch.clear();
            }
            if kinds.contains(&CacheKind::Remotes) {
                repository.remotes.clear();
            }
        }
        if all {
            self.documents.reset_all();
        }
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Whether git tracks `path`, in the working tree or at `reference`.
    pub async fn is_tracked(&self, path: &str, reference: Option<&str>) -> bool {
        match self.locate(path).await {
            Some((repo, file)) => self.is_tracked_in(&repo, &file, reference).await,
            None => false,
        }
    }

    pub(crate) async fn is_tracked_in(
        &self,
        repo_path: &str,
        file: &str,
        reference: Option<&str>,
    ) -> bool {
        let mut key = join(repo_path, file);
        if let Some(reference) = reference {
            key.push(':');
            key.push_str(reference);
        }

        let git = self.git.clone();
        let repo = repo_path.to_string();
        let file = file.to_string();
        let reference = reference.map(str::to_string);
        let tracked = self
            .caches
            .tracked
            .get_or_compute(&key, move || async move {
                Ok(Some(tracked_core(&git, &repo, &file, reference.as_deref()).await))
            })
            .await;
        tracked.is_some_and(|t| *t)
    }

    /// Full sha for `reference`; with `file`, the commit that last wrote
    /// the file's blob at `reference`.
    ///
    /// Uncommitted revisions pass through. `None` when `file` does not
    /// exist at `reference`. When the commit search outlasts `timeout`,
    /// `reference` comes back unresolved.
    pub async fn resolve_reference(
        &self,
        repo_path: &str,
        reference: &str,
        file: Option<&str>,
        timeout: Option<Duration>,
    ) -> Option<String> {
        if reference.is_empty() || rev::is_uncommitted(reference) {
            return Some(reference.to_string());
        }

        let Some(file) = file else {
            if rev::is_sha(reference) {
                return Some(reference.to_string());
            }
            let sha = self.git.verify(repo_path, reference, None).await.ok().flatten();
            return Some(sha.unwrap_or_else(|| reference.to_string()));
        };

        let (file, root) = split_path(file, Some(repo_path));
        let blob = self.git.verify(&root, reference, Some(&file)).await.ok().flatten()?;

        let ordering = self.settings().commit_ordering;
        let found = match self
            .git
            .exec(
                builders::log_find_object(&root, &blob, reference, ordering.as_deref(), Some(&file))
                    .timeout(timeout),
            )
            .await
        {
            Ok(data) => Some(data.trim().to_string()).filter(|sha| !sha.is_empty()),
            Err(err) => {
                debug!("resolve_reference({}) · {}", reference, err);
                None
            }
        };
        Some(found.unwrap_or_else(|| reference.to_string()))
    }

    /// Whether `reference` names an object in the repository.
    pub async fn validate_reference(&self, repo_path: &str, reference: &str) -> bool {
        if reference.is_empty() {
            return false;
        }
        if rev::is_uncommitted(reference) {
            return true;
        }
        matches!(self.git.verify(repo_path, reference, None).await, Ok(Some(_)))
    }

    pub async fn validate_branch_name(&self, repo_path: &str, name: &str) -> bool {
        self.git.check_ref_format(repo_path, name, true).await
    }

    /// `paths` without the ones git ignores.
    pub async fn exclude_ignored(&self, repo_path: &str, paths: Vec<String>) -> Vec<String> {
        if paths.is_empty() {
            return paths;
        }
        let relative: Vec<String> = paths
            .iter()
            .map(|p| split_path(p, Some(repo_path)).0)
            .collect();

        let data = match self
            .git
            .exec(builders::check_ignore(repo_path, &relative))
            .await
        {
            Ok(data) => data,
            Err(err) => {
                warn!("check-ignore failed in {}: {}", repo_path, err);
                return paths;
            }
        };
        let ignored: Vec<&str> = data.split('\0').filter(|p| !p.is_empty()).collect();
        if ignored.is_empty() {
            return paths;
        }

        paths
            .into_iter()
            .zip(relative)
            .filter(|(_, rel)| !ignored.contains(&rel.as_str()))
            .map(|(path, _)| path)
            .collect()
    }
}

/// `ls-files` in the working tree, then in `reference`'s tree, then in its
/// parent's.
async fn tracked_core(git: &Git, repo_path: &str, file: &str, reference: Option<&str>) -> bool {
    let listed = |reference: Option<String>| {
        let command = builders::ls_files(repo_path, file, reference.as_deref(), false);
        async move {
            git.exec(command)
                .await
                .map(|data| !data.trim().is_empty())
                .unwrap_or(false)
        }
    };

    if listed(None).await {
        return true;
    }
    let Some(reference) = reference.filter(|r| !rev::is_uncommitted(r)) else {
        return false;
    };
    if listed(Some(reference.to_string())).await {
        return true;
    }
    listed(Some(format!("{}^", reference))).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::version::GitVersion;
    use crate::git::mock::MockRunner;

    pub const REPO: &str = "/work/repo";

    /// Service over `mock` with `/work/repo` registered.
    pub fn service(mock: &MockRunner) -> GitService {
        service_with(mock, ServiceSettings::default())
    }

    pub fn service_with(mock: &MockRunner, settings: ServiceSettings) -> GitService {
        let git = Git::new(Arc::new(mock.clone()), "git", GitVersion::new(2, 40, 0));
        let service = GitService::new(git, settings);
        service.registry().insert(Repository::new(REPO, None));
        service
    }
}
