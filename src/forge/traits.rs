//! forge::traits
//!
//! Rich remote provider trait and the records it returns.
//!
//! # Design
//!
//! A rich remote provider is a remote whose host exposes an API beyond git
//! transport. The crate only consumes two lookups through it; the HTTP
//! clients live with the caller that registers a [`ProviderFactory`].
//!
//! Providers may fail without affecting any git result: the service logs
//! the error and reports no pull request.
//!
//! # Example
//!
//! ```ignore
//! use gitscope::forge::{RichRemoteProvider, ForgeError};
//!
//! async fn lookup(provider: &dyn RichRemoteProvider) -> Result<(), ForgeError> {
//!     if let Some(pr) = provider.pull_request_for_branch("feature").await? {
//!         println!("#{} {}", pr.number, pr.title);
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::Remote;

/// Errors from provider lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    /// The provider needs a connection the user has not made.
    #[error("authentication required")]
    AuthRequired,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("network error: {0}")]
    NetworkError(String),

    /// The lookup did not finish within the caller's timeout.
    #[error("provider timed out after {0} ms")]
    Timeout(u64),

    /// The operation is not supported by this provider.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Pull request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// Provider id, e.g. `github`
    pub provider: String,
    pub number: u64,
    pub url: String,
    pub title: String,
    pub state: PrState,
    pub head: String,
    pub base: String,
    pub date: Option<DateTime<Utc>>,
}

/// A remote host with an API.
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// repository using the remote.
#[async_trait]
pub trait RichRemoteProvider: Send + Sync {
    /// Provider id (`github`, `gitlab`, ...).
    fn id(&self) -> &'static str;

    /// Display name, e.g. `GitHub`.
    fn name(&self) -> &str;

    /// Last known connection state, when known without a round trip.
    fn maybe_connected(&self) -> Option<bool> {
        None
    }

    async fn is_connected(&self) -> bool;

    /// Open or most recent pull request whose head is `branch`.
    async fn pull_request_for_branch(&self, branch: &str) -> Result<Option<PullRequest>, ForgeError>;

    /// Pull request that introduced `sha`.
    async fn pull_request_for_commit(&self, sha: &str) -> Result<Option<PullRequest>, ForgeError>;
}

/// A remote paired with its provider.
#[derive(Clone)]
pub struct ProviderRemote {
    pub remote: Remote,
    pub provider: Arc<dyn RichRemoteProvider>,
    /// Marked as the preferred remote by configuration
    pub default: bool,
}

impl std::fmt::Debug for ProviderRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRemote")
            .field("remote", &self.remote.name)
            .field("provider", &self.provider.id())
            .field("default", &self.default)
            .finish()
    }
}

/// Builds providers for remotes whose host it recognizes.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, remote: &Remote) -> Option<Arc<dyn RichRemoteProvider>>;
}
