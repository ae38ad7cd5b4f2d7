//! cache
//!
//! Result caches layered over the git executor.
//!
//! # Modules
//!
//! - [`entry`] - Shared-future slots with empty sentinels
//! - [`document`] - Per-file blame, diff and log caches
//! - [`repository`] - Per-repository caches and change invalidation
//!
//! # Invariants
//!
//! - A hit returns the stored future, pending or not
//! - A miss stores the computation before it first suspends
//! - A failed computation leaves a sentinel that short-circuits later
//!   lookups until the cache is reset

pub mod document;
pub mod entry;
pub mod repository;

pub use document::{keys, DocumentTracker, TrackedDocument};
pub use entry::{CacheEntry, CacheSlots, Cached};
pub use repository::{
    contributors_key, CacheKind, RepositoryCaches, RepositoryChange, RepositoryChangeEvent,
};
