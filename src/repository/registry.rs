//! repository::registry
//!
//! Path-keyed registry of live repositories.
//!
//! # Architecture
//!
//! Roots are stored in a [`PathTree`]: a trie over path segments. The
//! repository that owns a file is the one registered at the deepest
//! ancestor of the file's path, so a submodule at `/a/b` shadows its
//! superproject at `/a` for everything beneath `/a/b`.
//!
//! Paths from a shared (guest) session live under `/~0`. A lookup that
//! misses in the primary namespace is retried in the guest namespace.
//!
//! # Invariants
//!
//! - At most one live [`Repository`] per normalized root
//! - Inserting an already registered root returns the existing handle
//! - Removing a root closes its handle

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::handle::Repository;
use crate::core::paths::{guest_path, normalize_path, to_guest_path, GUEST_PREFIX};

fn segments(path: &str) -> Vec<String> {
    normalize_path(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    children: BTreeMap<String, Node<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            value: None,
            children: BTreeMap::new(),
        }
    }
}

impl<T> Node<T> {
    fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn collect<'a: 'p, 'p>(&'a self, prefix: &mut Vec<&'p str>, out: &mut Vec<(String, &'a T)>) {
        if let Some(value) = &self.value {
            out.push((format!("/{}", prefix.join("/")), value));
        }
        for (segment, child) in &self.children {
            prefix.push(segment);
            child.collect(prefix, out);
            prefix.pop();
        }
    }
}

/// Trie over `/`-separated path segments.
///
/// # Example
///
/// ```
/// use gitscope::repository::PathTree;
///
/// let mut tree = PathTree::new();
/// tree.insert("/work/app", "app");
/// tree.insert("/work/app/vendor/lib", "lib");
///
/// assert_eq!(tree.find_substr("/work/app/src/main.rs"), Some(&"app"));
/// assert_eq!(tree.find_substr("/work/app/vendor/lib/x.c"), Some(&"lib"));
/// assert_eq!(tree.find_substr("/elsewhere"), None);
/// ```
#[derive(Debug)]
pub struct PathTree<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<T> PathTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `value` at `path`, returning the value it replaced.
    pub fn insert(&mut self, path: &str, value: T) -> Option<T> {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.children.entry(segment).or_default();
        }
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Value stored at exactly `path`.
    pub fn get(&self, path: &str) -> Option<&T> {
        let mut node = &self.root;
        for segment in segments(path) {
            node = node.children.get(&segment)?;
        }
        node.value.as_ref()
    }

    pub fn remove(&mut self, path: &str) -> Option<T> {
        let removed = Self::remove_at(&mut self.root, &segments(path));
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    fn remove_at(node: &mut Node<T>, segments: &[String]) -> Option<T> {
        let Some((first, rest)) = segments.split_first() else {
            return node.value.take();
        };
        let child = node.children.get_mut(first)?;
        let removed = Self::remove_at(child, rest);
        if child.is_empty() {
            node.children.remove(first);
        }
        removed
    }

    /// Value at the deepest ancestor of `path`, `path` included.
    pub fn find_substr(&self, path: &str) -> Option<&T> {
        let mut node = &self.root;
        let mut found = node.value.as_ref();
        for segment in segments(path) {
            match node.children.get(&segment) {
                Some(child) => {
                    node = child;
                    if node.value.is_some() {
                        found = node.value.as_ref();
                    }
                }
                None => break,
            }
        }
        found
    }

    /// Entries at or beneath `path`.
    pub fn find_superstr(&self, path: &str) -> Vec<(String, &T)> {
        let segs = segments(path);
        let mut node = &self.root;
        for segment in &segs {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }
        let mut prefix: Vec<&str> = segs.iter().map(String::as_str).collect();
        let mut out = Vec::new();
        node.collect(&mut prefix, &mut out);
        out
    }

    /// Every entry, in path order.
    pub fn entries(&self) -> Vec<(String, &T)> {
        let mut out = Vec::new();
        self.root.collect(&mut Vec::new(), &mut out);
        out
    }

    pub fn values(&self) -> Vec<&T> {
        self.entries().into_iter().map(|(_, v)| v).collect()
    }

    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }
}

/// Live repositories, shared by the service and its tasks.
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    tree: Arc<Mutex<PathTree<Arc<Repository>>>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PathTree<Arc<Repository>>> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `repository` and mark it active.
    ///
    /// When its root is already registered the existing handle is kept and
    /// returned, and `repository` is dropped.
    pub fn insert(&self, repository: Repository) -> Arc<Repository> {
        let mut tree = self.lock();
        if let Some(existing) = tree.get(repository.path()) {
            debug!("repository {} already registered", repository.path());
            return Arc::clone(existing);
        }

        repository.activate();
        let repository = Arc::new(repository);
        debug!("registering repository {}", repository.path());
        tree.insert(repository.path(), Arc::clone(&repository));
        repository
    }

    /// Repository registered at exactly `path`.
    pub fn get(&self, path: &str) -> Option<Arc<Repository>> {
        self.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().get(path).is_some()
    }

    /// Repository owning `path`: the deepest registered ancestor.
    ///
    /// A miss is retried in the guest namespace, in either direction.
    pub fn find(&self, path: &str) -> Option<Arc<Repository>> {
        let tree = self.lock();
        if let Some(found) = tree.find_substr(path) {
            return Some(Arc::clone(found));
        }

        let path = normalize_path(path);
        let alternate = if path.starts_with(GUEST_PREFIX) {
            guest_path(&path)?
        } else {
            to_guest_path(&path)
        };
        tree.find_substr(&alternate).cloned()
    }

    /// Repositories at or beneath `path`.
    pub fn beneath(&self, path: &str) -> Vec<Arc<Repository>> {
        self.lock()
            .find_superstr(path)
            .into_iter()
            .map(|(_, r)| Arc::clone(r))
            .collect()
    }

    /// Unregister and close the repository at `path`.
    pub fn remove(&self, path: &str) -> Option<Arc<Repository>> {
        let removed = self.lock().remove(path);
        if let Some(repository) = &removed {
            debug!("removing repository {}", repository.path());
            repository.close();
        }
        removed
    }

    /// Unregister and close every repository discovered from `workspace`.
    pub fn remove_workspace(&self, workspace: &str) -> Vec<Arc<Repository>> {
        let workspace = normalize_path(workspace);
        let mut tree = self.lock();
        let doomed: Vec<String> = tree
            .entries()
            .into_iter()
            .filter(|(_, r)| r.workspace() == Some(workspace.as_str()))
            .map(|(path, _)| path)
            .collect();

        doomed
            .iter()
            .filter_map(|path| tree.remove(path))
            .inspect(|r| r.close())
            .collect()
    }

    pub fn repositories(&self) -> Vec<Arc<Repository>> {
        self.lock().values().into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and drop every repository.
    pub fn clear(&self) {
        let mut tree = self.lock();
        for repository in tree.values() {
            repository.close();
        }
        tree.clear();
    }
}
