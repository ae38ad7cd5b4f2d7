//! forge::mock
//!
//! Mock provider for deterministic testing.
//!
//! # Design
//!
//! Pull requests are stored in memory by branch and by commit. A delay makes
//! lookups slow enough to lose a timeout race, and a scripted error makes
//! them fail. Every lookup is recorded.
//!
//! # Example
//!
//! ```
//! use gitscope::forge::mock::MockProvider;
//! use gitscope::forge::{PrState, RichRemoteProvider};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let provider = MockProvider::new();
//! provider.add_for_branch("feature", 7, PrState::Open);
//!
//! let pr = provider.pull_request_for_branch("feature").await.unwrap().unwrap();
//! assert_eq!(pr.number, 7);
//! assert_eq!(provider.lookups().len(), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{ForgeError, PrState, ProviderFactory, PullRequest, RichRemoteProvider};
use crate::models::Remote;

/// Mock provider for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockProvider {
    inner: Arc<Mutex<MockProviderInner>>,
}

#[derive(Debug)]
struct MockProviderInner {
    by_branch: HashMap<String, PullRequest>,
    by_commit: HashMap<String, PullRequest>,
    connected: bool,
    delay: Option<Duration>,
    fail_with: Option<ForgeError>,
    lookups: Vec<MockLookup>,
}

/// Recorded lookup for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockLookup {
    Branch(String),
    Commit(String),
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// A connected provider with no pull requests.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockProviderInner {
                by_branch: HashMap::new(),
                by_commit: HashMap::new(),
                connected: true,
                delay: None,
                fail_with: None,
                lookups: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockProviderInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pull_request(number: u64, head: &str, state: PrState) -> PullRequest {
        PullRequest {
            provider: "mock".into(),
            number,
            url: format!("https://example.com/pr/{}", number),
            title: format!("PR {}", number),
            state,
            head: head.into(),
            base: "main".into(),
            date: None,
        }
    }

    pub fn add_for_branch(&self, branch: &str, number: u64, state: PrState) {
        let pr = Self::pull_request(number, branch, state);
        self.lock().by_branch.insert(branch.to_string(), pr);
    }

    pub fn add_for_commit(&self, sha: &str, number: u64) {
        let pr = Self::pull_request(number, "", PrState::Merged);
        self.lock().by_commit.insert(sha.to_string(), pr);
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn fail_with(&self, error: ForgeError) {
        self.lock().fail_with = Some(error);
    }

    pub fn lookups(&self) -> Vec<MockLookup> {
        self.lock().lookups.clone()
    }

    async fn lookup(
        &self,
        lookup: MockLookup,
    ) -> Result<Option<PullRequest>, ForgeError> {
        let (delay, result) = {
            let mut inner = self.lock();
            inner.lookups.push(lookup.clone());
            let result = match (&inner.fail_with, &lookup) {
                (Some(err), _) => Err(err.clone()),
                (None, MockLookup::Branch(b)) => Ok(inner.by_branch.get(b).cloned()),
                (None, MockLookup::Commit(c)) => Ok(inner.by_commit.get(c).cloned()),
            };
            (inner.delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

#[async_trait]
impl RichRemoteProvider for MockProvider {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock"
    }

    async fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn pull_request_for_branch(&self, branch: &str) -> Result<Option<PullRequest>, ForgeError> {
        self.lookup(MockLookup::Branch(branch.to_string())).await
    }

    async fn pull_request_for_commit(&self, sha: &str) -> Result<Option<PullRequest>, ForgeError> {
        self.lookup(MockLookup::Commit(sha.to_string())).await
    }
}

/// Factory that hands out one shared [`MockProvider`] for chosen remotes.
#[derive(Debug, Clone)]
pub struct MockProviderFactory {
    pub provider: MockProvider,
    /// Remote names that get a provider; empty means all
    pub remotes: Vec<String>,
}

impl MockProviderFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider,
            remotes: Vec::new(),
        }
    }

    pub fn for_remotes(provider: MockProvider, remotes: &[&str]) -> Self {
        Self {
            provider,
            remotes: remotes.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl ProviderFactory for MockProviderFactory {
    fn create(&self, remote: &Remote) -> Option<Arc<dyn RichRemoteProvider>> {
        if self.remotes.is_empty() || self.remotes.contains(&remote.name) {
            Some(Arc::new(self.provider.clone()))
        } else {
            None
        }
    }
}
