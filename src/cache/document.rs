//! cache::document
//!
//! Per-file caches of blame, diff and log results.
//!
//! A [`TrackedDocument`] is created the first time a file is asked about
//! and lives until the file is untracked (its editor closed) or its
//! repository is reset. Each document owns one [`CacheSlots`] per result
//! kind; slot keys are built by [`keys`] and always carry the revision, so
//! a committed blame and a dirty-buffer blame never share an entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::entry::CacheSlots;
use crate::core::paths::normalize_path;
use crate::core::types::ContentHash;
use crate::models::{GitBlame, GitDiff, GitLog};

/// Slot keys.
pub mod keys {
    use super::ContentHash;

    /// `blame` or `blame:<sha>`.
    pub fn blame(sha: Option<&str>) -> String {
        match sha {
            Some(sha) => format!("blame:{}", sha),
            None => "blame".to_string(),
        }
    }

    /// `blame:<hash>` for unsaved contents.
    pub fn blame_contents(hash: &ContentHash) -> String {
        format!("blame:{}", hash)
    }

    /// `diff[:<ref1>][:<ref2>]`.
    pub fn diff(ref1: Option<&str>, ref2: Option<&str>) -> String {
        let mut key = "diff".to_string();
        for reference in [ref1, ref2].into_iter().flatten() {
            key.push(':');
            key.push_str(reference);
        }
        key
    }

    /// `diff:<ref>:<hash>` for unsaved contents against `reference`.
    pub fn diff_contents(reference: &str, hash: &ContentHash) -> String {
        format!("diff:{}:{}", reference, hash)
    }

    /// Options that shape a file history.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct LogKey<'a> {
        pub reference: Option<&'a str>,
        pub all: bool,
        pub limit: Option<usize>,
        pub follow: bool,
        pub reverse: bool,
        pub since: Option<&'a str>,
        pub skip: usize,
    }

    /// `log[:<ref>][:all][:n<limit>][:follow][:reverse][:since=<s>][:skip<n>]`.
    pub fn log(key: &LogKey<'_>) -> String {
        let mut out = "log".to_string();
        if let Some(reference) = key.reference {
            out.push_str(&format!(":{}", reference));
        }
        if key.all {
            out.push_str(":all");
        }
        if let Some(limit) = key.limit.filter(|l| *l > 0) {
            out.push_str(&format!(":n{}", limit));
        }
        if key.follow {
            out.push_str(":follow");
        }
        if key.reverse {
            out.push_str(":reverse");
        }
        if let Some(since) = key.since {
            out.push_str(&format!(":since={}", since));
        }
        if key.skip > 0 {
            out.push_str(&format!(":skip{}", key.skip));
        }
        out
    }

    /// Key of the unbounded history a narrower request can be sliced from.
    pub fn full_log(follow: bool, reverse: bool) -> String {
        log(&LogKey {
            follow,
            reverse,
            ..Default::default()
        })
    }
}

/// Cached results for one file.
#[derive(Debug)]
pub struct TrackedDocument {
    path: String,
    repo_path: Option<String>,
    pub blame: CacheSlots<GitBlame>,
    pub diff: CacheSlots<GitDiff>,
    pub log: CacheSlots<GitLog>,
    blame_failure: Mutex<Option<String>>,
}

impl TrackedDocument {
    fn new(path: String, repo_path: Option<String>) -> Self {
        Self {
            path,
            repo_path,
            blame: CacheSlots::new("blame"),
            diff: CacheSlots::new("diff"),
            log: CacheSlots::new("log"),
            blame_failure: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn repo_path(&self) -> Option<&str> {
        self.repo_path.as_deref()
    }

    /// Remember that blaming this file failed.
    pub fn set_blame_failure(&self, message: &str) {
        if let Ok(mut failure) = self.blame_failure.lock() {
            *failure = Some(message.to_string());
        }
    }

    pub fn blame_failure(&self) -> Option<String> {
        self.blame_failure.lock().ok().and_then(|f| f.clone())
    }

    /// Drop every cached result.
    pub fn reset(&self) {
        self.blame.clear();
        self.diff.clear();
        self.log.clear();
        if let Ok(mut failure) = self.blame_failure.lock() {
            *failure = None;
        }
    }
}

/// Documents keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct DocumentTracker {
    documents: Arc<Mutex<HashMap<String, Arc<TrackedDocument>>>>,
}

impl DocumentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<TrackedDocument>>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The document for `path`, created on first access.
    pub fn get_or_add(&self, path: &str, repo_path: Option<&str>) -> Arc<TrackedDocument> {
        let path = normalize_path(path);
        let mut documents = self.lock();
        if let Some(doc) = documents.get(&path) {
            return Arc::clone(doc);
        }
        debug!("tracking {}", path);
        let doc = Arc::new(TrackedDocument::new(
            path.clone(),
            repo_path.map(normalize_path),
        ));
        documents.insert(path, Arc::clone(&doc));
        doc
    }

    pub fn get(&self, path: &str) -> Option<Arc<TrackedDocument>> {
        self.lock().get(&normalize_path(path)).cloned()
    }

    /// Stop tracking `path`, dropping its caches.
    pub fn untrack(&self, path: &str) -> bool {
        let removed = self.lock().remove(&normalize_path(path));
        if let Some(doc) = &removed {
            debug!("untracking {}", doc.path());
        }
        removed.is_some()
    }

    /// Reset the caches of every document in `repo_path`.
    pub fn reset_repository(&self, repo_path: &str) {
        let repo_path = normalize_path(repo_path);
        for doc in self.lock().values() {
            if doc.repo_path() == Some(repo_path.as_str()) {
                doc.reset();
            }
        }
    }

    /// Forget every document in `repo_path`, e.g. when it closes.
    pub fn remove_repository(&self, repo_path: &str) {
        let repo_path = normalize_path(repo_path);
        self.lock()
            .retain(|_, doc| doc.repo_path() != Some(repo_path.as_str()));
    }

    pub fn reset_all(&self) {
        for doc in self.lock().values() {
            doc.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::CacheEntry;
    use crate::models::GitDiff;

    fn empty_diff() -> GitDiff {
        GitDiff {
            base_sha: "a".into(),
            compare_sha: None,
            hunks: Vec::new(),
        }
    }

    mod key_format {
        use super::super::keys::*;
        use crate::core::types::ContentHash;

        #[test]
        fn blame_keys_carry_revision_and_hash() {
            assert_eq!(blame(None), "blame");
            assert_eq!(blame(Some("abc")), "blame:abc");
            let hash = ContentHash::of("dirty buffer");
            assert_ne!(blame_contents(&hash), blame(None));
            assert!(blame_contents(&hash).starts_with("blame:"));
        }

        #[test]
        fn diff_keys() {
            assert_eq!(diff(None, None), "diff");
            assert_eq!(diff(Some("HEAD"), None), "diff:HEAD");
            assert_eq!(diff(Some("a"), Some("b")), "diff:a:b");
            let hash = ContentHash::of("x");
            assert_ne!(diff_contents("HEAD", &hash), diff_contents("abc", &hash));
        }

        #[test]
        fn log_keys() {
            let key = LogKey {
                reference: Some("abc"),
                all: true,
                limit: Some(50),
                follow: true,
                since: Some("2024-01-01"),
                skip: 10,
                ..Default::default()
            };
            assert_eq!(log(&key), "log:abc:all:n50:follow:since=2024-01-01:skip10");
            assert_eq!(full_log(true, false), "log:follow");
            assert_eq!(log(&LogKey::default()), "log");
        }
    }

    #[test]
    fn documents_are_created_once_per_path() {
        let tracker = DocumentTracker::new();
        let a = tracker.get_or_add("/repo/a.rs", Some("/repo"));
        let b = tracker.get_or_add("/repo/a.rs/", None);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.repo_path(), Some("/repo"));
        assert_eq!(tracker.len(), 1);

        assert!(tracker.untrack("/repo/a.rs"));
        assert!(tracker.get("/repo/a.rs").is_none());
    }

    #[test]
    fn repository_reset_only_touches_its_documents() {
        let tracker = DocumentTracker::new();
        let mine = tracker.get_or_add("/repo/a.rs", Some("/repo"));
        let other = tracker.get_or_add("/other/b.rs", Some("/other"));
        mine.diff.set("diff", CacheEntry::resolved(empty_diff()));
        other.diff.set("diff", CacheEntry::resolved(empty_diff()));
        mine.set_blame_failure("no such path");

        tracker.reset_repository("/repo");

        assert!(mine.diff.is_empty());
        assert!(mine.blame_failure().is_none());
        assert_eq!(other.diff.len(), 1);

        tracker.remove_repository("/other");
        assert!(tracker.get("/other/b.rs").is_none());
        assert!(tracker.get("/repo/a.rs").is_some());
    }
}
