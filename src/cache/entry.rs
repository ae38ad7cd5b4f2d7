//! cache::entry
//!
//! Keyed slots holding shared, possibly still running, computations.
//!
//! # Design
//!
//! A miss stores the computation itself, not its eventual value, so callers
//! arriving while it runs await the same future. When the computation
//! fails, its entry is replaced by a resolved empty sentinel carrying the
//! error message; later lookups return the sentinel without recomputing.
//! A timeout or cancellation removes the entry instead, since nothing was
//! learned about the key.
//!
//! The stored future holds only a weak reference back to its slots, so
//! dropping a [`CacheSlots`] frees its entries even if some are pending.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::git::GitError;

/// Resolved value of a cache entry; `None` is an empty result.
pub type Cached<T> = Option<Arc<T>>;

type SharedCached<T> = Shared<BoxFuture<'static, Cached<T>>>;

/// One cached computation.
pub struct CacheEntry<T> {
    id: u64,
    value: SharedCached<T>,
    error_message: Option<String>,
    sentinel: bool,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: self.value.clone(),
            error_message: self.error_message.clone(),
            sentinel: self.sentinel,
        }
    }
}

impl<T> std::fmt::Debug for CacheEntry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("id", &self.id)
            .field("resolved", &self.value.peek().is_some())
            .field("sentinel", &self.sentinel)
            .field("error_message", &self.error_message)
            .finish()
    }
}

impl<T: Send + Sync + 'static> CacheEntry<T> {
    fn pending(id: u64, value: BoxFuture<'static, Cached<T>>) -> Self {
        Self {
            id,
            value: value.shared(),
            error_message: None,
            sentinel: false,
        }
    }

    /// An already resolved value.
    pub fn resolved(value: T) -> Self {
        Self::ready(Some(Arc::new(value)), None, false)
    }

    /// The empty sentinel stored after an expected failure.
    pub fn empty(error_message: Option<String>) -> Self {
        Self::ready(None, error_message, true)
    }

    fn ready(value: Cached<T>, error_message: Option<String>, sentinel: bool) -> Self {
        Self {
            id: 0,
            value: future::ready(value).boxed().shared(),
            error_message,
            sentinel,
        }
    }

    /// Await the value, joining the computation if it is still running.
    pub async fn value(&self) -> Cached<T> {
        self.value.clone().await
    }

    /// The value if already resolved.
    pub fn peek(&self) -> Option<Cached<T>> {
        self.value.peek().cloned()
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

type Entries<T> = Mutex<HashMap<String, CacheEntry<T>>>;

/// String-keyed cache of shared computations.
pub struct CacheSlots<T> {
    name: &'static str,
    entries: Arc<Entries<T>>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for CacheSlots<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entries: Arc::clone(&self.entries),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T> std::fmt::Debug for CacheSlots<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.lock().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("CacheSlots")
            .field("name", &self.name)
            .field("entries", &len)
            .finish()
    }
}

impl<T: Send + Sync + 'static> CacheSlots<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the entry for `key`, or start `producer` and store it first.
    ///
    /// `producer` is called with the slot map locked; it must only build
    /// the future, not run it.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, producer: F) -> Cached<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, GitError>> + Send + 'static,
    {
        self.entry_or_compute(key, producer).value().await
    }

    /// Like [`get_or_compute`](Self::get_or_compute) but returns the entry,
    /// so the caller can tell a sentinel from a computed value.
    pub fn entry_or_compute<F, Fut>(&self, key: &str, producer: F) -> CacheEntry<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, GitError>> + Send + 'static,
    {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(key) {
            debug!("{} cache hit: '{}'", self.name, key);
            return entry.clone();
        }
        debug!("{} cache miss: '{}'", self.name, key);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(&self.entries);
        let name = self.name;
        let owned_key = key.to_string();
        let computation = producer();

        let value = async move {
            match computation.await {
                Ok(value) => value.map(Arc::new),
                Err(err) => {
                    Self::record_failure(&weak, name, &owned_key, id, &err);
                    None
                }
            }
        }
        .boxed();

        let entry = CacheEntry::pending(id, value);
        entries.insert(key.to_string(), entry.clone());
        debug!("{} cache add: '{}'", self.name, key);
        entry
    }

    fn record_failure(weak: &Weak<Entries<T>>, name: &str, key: &str, id: u64, err: &GitError) {
        let Some(entries) = weak.upgrade() else {
            return;
        };
        let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).map_or(true, |e| e.id != id) {
            return;
        }

        if matches!(err, GitError::Timeout(_) | GitError::Cancelled(_)) {
            debug!("{} cache remove: '{}' · {}", name, key, err);
            entries.remove(key);
        } else {
            debug!("{} cache replace (with empty sentinel): '{}'", name, key);
            entries.insert(key.to_string(), CacheEntry::empty(Some(err.to_string())));
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, entry: CacheEntry<T>) {
        self.lock().insert(key.to_string(), entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop entries whose key fails `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&str) -> bool) {
        self.lock().retain(|key, _| keep(key));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Message captured when `key` failed, if it did.
    pub fn error_message(&self, key: &str) -> Option<String> {
        self.lock()
            .get(key)
            .and_then(|e| e.error_message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::GitVersion;
    use crate::git::mock::MockRunner;
    use crate::git::{Git, GitCommand, RunError};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting(
        calls: &Arc<AtomicUsize>,
        result: Result<Option<&'static str>, GitError>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Option<&'static str>, GitError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                result
            }
            .boxed()
        }
    }

    fn run_error() -> GitError {
        RunError::exited(
            "git blame".into(),
            Some(128),
            String::new(),
            "fatal: no such path 'a.txt' in HEAD".into(),
        )
        .into()
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_computation() {
        let slots: CacheSlots<&'static str> = CacheSlots::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            slots.get_or_compute("blame", counting(&calls, Ok(Some("x")))),
            slots.get_or_compute("blame", counting(&calls, Ok(Some("y")))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.as_deref(), Some(&"x"));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }

    #[tokio::test]
    async fn hit_returns_the_pending_entry() {
        let slots: CacheSlots<&'static str> = CacheSlots::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let first = slots.entry_or_compute("k", counting(&calls, Ok(Some("v"))));
        assert!(first.peek().is_none());
        let second = slots.entry_or_compute("k", counting(&calls, Ok(Some("w"))));
        assert_eq!(first.id, second.id);

        assert_eq!(second.value().await.as_deref(), Some(&"v"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_becomes_sticky_sentinel() {
        let slots: CacheSlots<&'static str> = CacheSlots::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(slots.get_or_compute("k", counting(&calls, Err(run_error()))).await.is_none());
        for _ in 0..3 {
            assert!(slots.get_or_compute("k", counting(&calls, Ok(Some("v")))).await.is_none());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let entry = slots.get("k").unwrap();
        assert!(entry.is_sentinel());
        assert!(slots.error_message("k").unwrap().contains("no such path"));

        slots.clear();
        assert_eq!(
            slots.get_or_compute("k", counting(&calls, Ok(Some("v")))).await.as_deref(),
            Some(&"v")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_success_is_cached_but_not_a_sentinel() {
        let slots: CacheSlots<&'static str> = CacheSlots::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        assert!(slots.get_or_compute("k", counting(&calls, Ok(None))).await.is_none());
        assert!(slots.get_or_compute("k", counting(&calls, Ok(Some("v")))).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!slots.get("k").unwrap().is_sentinel());
    }

    #[tokio::test]
    async fn timeout_removes_entry() {
        let slots: CacheSlots<&'static str> = CacheSlots::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let timeout = Err(GitError::Timeout(Duration::from_millis(5)));
        assert!(slots.get_or_compute("k", counting(&calls, timeout)).await.is_none());
        assert!(slots.get("k").is_none());
    }

    #[tokio::test]
    async fn abandoned_git_wait_is_not_cached() {
        let mock = MockRunner::new();
        mock.set_delay(Duration::from_millis(40));
        mock.respond(&["rev-parse"], "abc\n");
        let git = Git::new(Arc::new(mock.clone()), "git", GitVersion::new(2, 40, 0));
        let slots: CacheSlots<String> = CacheSlots::new("test");
        let cmd = GitCommand::new("/repo", ["rev-parse", "HEAD"]);

        let hurried = {
            let git = git.clone();
            let cmd = cmd.clone().timeout(Some(Duration::from_millis(5)));
            move || async move { git.exec(cmd).await.map(Some) }
        };
        let (cached, direct) = tokio::join!(slots.get_or_compute("head", hurried), git.exec(cmd.clone()));

        assert!(cached.is_none());
        assert!(slots.get("head").is_none());
        assert_eq!(direct.unwrap(), "abc\n");
        assert_eq!(mock.count(&["rev-parse"]), 1);

        let git2 = git.clone();
        let value = slots
            .get_or_compute("head", move || async move { git2.exec(cmd).await.map(Some) })
            .await;
        assert_eq!(value.as_deref().map(String::as_str), Some("abc\n"));
    }

    #[tokio::test]
    async fn reset_during_computation_keeps_new_entry() {
        let slots: CacheSlots<&'static str> = CacheSlots::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let stale = slots.entry_or_compute("k", counting(&calls, Err(run_error())));
        slots.clear();
        slots.set("k", CacheEntry::resolved("fresh"));

        assert!(stale.value().await.is_none());
        let entry = slots.get("k").unwrap();
        assert!(!entry.is_sentinel());
        assert_eq!(entry.value().await.as_deref(), Some(&"fresh"));
    }

    #[test]
    fn dropping_slots_frees_pending_entries() {
        let slots: CacheSlots<String> = CacheSlots::new("test");
        let weak = Arc::downgrade(&slots.entries);
        let _entry = slots.entry_or_compute("k", || async { Ok(Some("v".to_string())) });
        drop(slots);
        assert!(weak.upgrade().is_none());
    }
}
