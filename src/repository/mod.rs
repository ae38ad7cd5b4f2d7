//! repository
//!
//! Which repository owns a path, and which repositories exist.
//!
//! # Modules
//!
//! - [`registry`] - Longest-prefix path registry of live repositories
//! - [`handle`] - Repository handle and lifecycle
//! - [`discovery`] - Workspace scan for nested repositories

pub mod discovery;
pub mod handle;
pub mod registry;

pub use discovery::{find_git_dirs, normalize_excludes, repository_search};
pub use handle::{Repository, RepositoryState};
pub use registry::{PathTree, RepositoryRegistry};
