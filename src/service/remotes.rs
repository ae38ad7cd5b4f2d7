//! service::remotes
//!
//! Remotes, the rich provider chosen among them, and pull request lookups.
//!
//! Provider identity is cached per repository; whether a provider is
//! connected is cached apart from it, so reconnecting does not rebuild the
//! provider. Lookups run under `provider_timeout` and their failures never
//! reach git results.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::GitService;
use crate::forge::{provider_remotes, select_remote, ForgeError, ProviderRemote, PullRequest};
use crate::git::{builders, GitError};
use crate::models::{Branch, Remote};
use crate::parsers::parse_remotes;
use crate::repository::Repository;

fn connection_key(remote: &ProviderRemote) -> String {
    format!(
        "{}|{}/{}",
        remote.provider.id(),
        remote.remote.domain,
        remote.remote.path
    )
}

impl GitService {
    /// Configured remotes with their fetch and push urls.
    pub async fn remotes(&self, repo_path: &str) -> Vec<Remote> {
        let git = self.git.clone();
        let repo = repo_path.to_string();
        let producer = move || async move {
            let data = git.exec(builders::remotes(&repo)).await?;
            Ok::<_, GitError>(Some(parse_remotes(&data, &repo)))
        };

        let remotes = match self.registry.get(repo_path) {
            Some(repository) => {
                self.cached(&repository.remotes, Repository::remotes_key(), producer)
                    .await
            }
            None => match producer().await {
                Ok(remotes) => remotes.map(Arc::new),
                Err(err) => {
                    warn!("remotes of {} failed: {}", repo_path, err);
                    None
                }
            },
        };
        remotes.map(|r| r.as_ref().clone()).unwrap_or_default()
    }

    /// Provider-backed remote that answers lookups for the repository.
    ///
    /// Without `include_disconnected`, a provider the user has not
    /// connected is treated as absent.
    pub async fn rich_remote_provider(
        &self,
        repo_path: &str,
        include_disconnected: bool,
    ) -> Option<ProviderRemote> {
        self.providers.as_ref()?;

        let this = self.clone();
        let repo = repo_path.to_string();
        let selected = self
            .caches
            .providers
            .get_or_compute(repo_path, move || async move {
                Ok(this.select_provider(&repo).await)
            })
            .await?;
        let selected = selected.as_ref().clone();

        if include_disconnected || self.provider_connected(&selected).await {
            Some(selected)
        } else {
            debug!(
                "provider {} for {} is not connected",
                selected.provider.id(),
                repo_path
            );
            None
        }
    }

    async fn select_provider(&self, repo_path: &str) -> Option<ProviderRemote> {
        let factory = self.providers.clone()?;
        let remotes = self.remotes(repo_path).await;
        let default_remote = self.settings().default_remote;
        let candidates = provider_remotes(&remotes, factory.as_ref(), default_remote.as_deref());
        if candidates.is_empty() {
            return None;
        }

        let branch = self.branch(repo_path).await;
        let branch_remote = branch
            .as_ref()
            .and_then(|b| b.upstream.as_ref())
            .and_then(|u| u.name.split('/').next())
            .map(str::to_string);
        select_remote(&candidates, branch_remote.as_deref())
    }

    async fn provider_connected(&self, remote: &ProviderRemote) -> bool {
        let key = connection_key(remote);
        if let Some(connected) = self.caches.is_connected(&key) {
            return connected;
        }
        let connected = match remote.provider.maybe_connected() {
            Some(connected) => connected,
            None => remote.provider.is_connected().await,
        };
        self.caches.set_connected(&key, connected);
        connected
    }

    /// Pull request whose head is `branch`.
    ///
    /// Remote branches are looked up by their name on the remote.
    pub async fn pull_request_for_branch(
        &self,
        branch: &Branch,
    ) -> Result<Option<PullRequest>, ForgeError> {
        let Some(remote) = self.rich_remote_provider(&branch.repo_path, false).await else {
            return Ok(None);
        };
        let name = branch.base_name().to_string();
        let provider = remote.provider.clone();
        self.with_provider_timeout(async move { provider.pull_request_for_branch(&name).await })
            .await
    }

    /// Pull request that introduced `sha`.
    pub async fn pull_request_for_commit(
        &self,
        repo_path: &str,
        sha: &str,
    ) -> Result<Option<PullRequest>, ForgeError> {
        let Some(remote) = self.rich_remote_provider(repo_path, false).await else {
            return Ok(None);
        };
        let provider = remote.provider.clone();
        let sha = sha.to_string();
        self.with_provider_timeout(async move { provider.pull_request_for_commit(&sha).await })
            .await
    }

    async fn with_provider_timeout<F>(&self, lookup: F) -> Result<Option<PullRequest>, ForgeError>
    where
        F: Future<Output = Result<Option<PullRequest>, ForgeError>>,
    {
        let result = match self.settings().provider_timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(result) => result,
                Err(_) => Err(ForgeError::Timeout(millis(limit))),
            },
            None => lookup.await,
        };
        if let Err(err) = &result {
            warn!("pull request lookup failed: {}", err);
        }
        result
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
