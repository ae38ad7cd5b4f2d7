//! forge::factory
//!
//! Provider detection and remote selection.
//!
//! # Provider Detection
//!
//! The host of a remote decides its provider kind:
//! - `github.com` → GitHub
//! - `gitlab.com` → GitLab
//! - `bitbucket.org` → Bitbucket
//! - `dev.azure.com`, `*.visualstudio.com` → Azure DevOps
//!
//! Whether a provider instance exists for a kind is up to the registered
//! [`ProviderFactory`].
//!
//! # Selection
//!
//! With several provider-backed remotes, the remote tracked by the current
//! branch wins, then `upstream`, then `origin`. A remote marked as default
//! is used only when none of those names match.

use std::collections::HashMap;

use super::traits::{ProviderFactory, ProviderRemote};
use crate::models::Remote;

/// Known provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForgeProvider {
    GitHub,
    GitLab,
    Bitbucket,
    AzureDevOps,
}

impl ForgeProvider {
    pub fn all() -> &'static [ForgeProvider] {
        &[
            ForgeProvider::GitHub,
            ForgeProvider::GitLab,
            ForgeProvider::Bitbucket,
            ForgeProvider::AzureDevOps,
        ]
    }

    /// Name used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitHub => "github",
            ForgeProvider::GitLab => "gitlab",
            ForgeProvider::Bitbucket => "bitbucket",
            ForgeProvider::AzureDevOps => "azure-devops",
        }
    }

    /// # Example
    ///
    /// ```
    /// use gitscope::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitHub"), Some(ForgeProvider::GitHub));
    /// assert_eq!(ForgeProvider::parse("unknown"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        Self::all().iter().copied().find(|p| p.name() == s)
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Provider kind for a remote host.
///
/// ```
/// use gitscope::forge::{detect_provider, ForgeProvider};
///
/// assert_eq!(detect_provider("github.com"), Some(ForgeProvider::GitHub));
/// assert_eq!(detect_provider("example.com"), None);
/// ```
pub fn detect_provider(domain: &str) -> Option<ForgeProvider> {
    let domain = domain.to_lowercase();
    let domain = domain.split(':').next().unwrap_or_default();
    match domain {
        "github.com" => Some(ForgeProvider::GitHub),
        "gitlab.com" => Some(ForgeProvider::GitLab),
        "bitbucket.org" => Some(ForgeProvider::Bitbucket),
        "dev.azure.com" | "ssh.dev.azure.com" => Some(ForgeProvider::AzureDevOps),
        d if d.ends_with(".visualstudio.com") => Some(ForgeProvider::AzureDevOps),
        _ => None,
    }
}

/// Pair each remote with a provider from `factory`, dropping those without one.
pub fn provider_remotes(
    remotes: &[Remote],
    factory: &dyn ProviderFactory,
    default_remote: Option<&str>,
) -> Vec<ProviderRemote> {
    remotes
        .iter()
        .filter_map(|remote| {
            factory.create(remote).map(|provider| ProviderRemote {
                remote: remote.clone(),
                provider,
                default: default_remote == Some(remote.name.as_str()),
            })
        })
        .collect()
}

const BRANCH_REMOTE_WEIGHT: i32 = 100;

/// Pick the remote whose provider should answer lookups.
pub fn select_remote(
    candidates: &[ProviderRemote],
    branch_remote: Option<&str>,
) -> Option<ProviderRemote> {
    if candidates.len() <= 1 {
        return candidates.first().cloned();
    }

    let mut weights: HashMap<&str, i32> = HashMap::from([("upstream", 15), ("origin", 10)]);
    if let Some(name) = branch_remote {
        weights.insert(name, BRANCH_REMOTE_WEIGHT);
    }

    let mut best: Option<&ProviderRemote> = None;
    let mut weight = 0;
    for candidate in candidates {
        let matched = weights
            .get(candidate.remote.name.as_str())
            .copied()
            .unwrap_or(-1);
        if matched > weight {
            best = Some(candidate);
            weight = matched;
        }
    }

    best.or_else(|| candidates.iter().find(|c| c.default)).cloned()
}
