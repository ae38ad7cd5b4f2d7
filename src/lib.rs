//! gitscope - git process orchestration with caching
//!
//! gitscope answers the questions an editor asks of git (who changed this
//! line, what changed in this file, what is the history here, which branch
//! am I on) by running the `git` CLI and caching parsed results until the
//! repository changes.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`core`] - Revisions, versions, paths, configuration
//! - [`git`] - The only place that spawns `git`: runner, dedup, builders
//! - [`parsers`] - Wire formats of git output and their parsers
//! - [`models`] - Parsed records (blame, diff, log, branches, status)
//! - [`cache`] - Per-document and per-repository result caches
//! - [`repository`] - Repository handles, registry, discovery
//! - [`forge`] - Rich remote providers and pull request lookups
//! - [`service`] - The [`GitService`](service::GitService) façade
//! - [`cli`] / [`ui`] - The thin `gscope` binary
//!
//! # Invariants
//!
//! 1. Identical concurrent git invocations share one process
//! 2. A cache stores the computation before it finishes, so callers share it
//! 3. Failures are cached as empty sentinels until the repository changes
//! 4. Timeouts and cancellations are never cached

pub mod cache;
pub mod cli;
pub mod core;
pub mod forge;
pub mod git;
pub mod models;
pub mod parsers;
pub mod repository;
pub mod service;
pub mod ui;
