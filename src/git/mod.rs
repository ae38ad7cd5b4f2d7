//! git
//!
//! Process orchestration for the `git` CLI.
//!
//! # Architecture
//!
//! This module is the only place that spawns `git`. Callers describe an
//! invocation with a [`GitCommand`] (usually produced by a function in
//! [`builders`]) and hand it to [`Git`], which:
//!
//! 1. prefixes the global `-c` configs and the non-interactive environment,
//! 2. joins an identical in-flight invocation through the
//!    [`CommandDeduplicator`] instead of spawning a second process,
//! 3. classifies failures ([`GitWarning`], [`KnownError`]) and applies the
//!    command's [`ErrorHandling`] mode.
//!
//! Operations that need several invocations (fallback chains, retries,
//! existence probes) live in [`ops`] as further methods on [`Git`].
//!
//! # Invariants
//!
//! - At most one process runs per dedup signature at any time
//! - Every process sees `GCM_INTERACTIVE=NEVER` and `LC_ALL=C`
//! - Errors are `Clone` so shared futures can hand them to every waiter
//!
//! # Example
//!
//! ```ignore
//! use gitscope::git::{builders, Git};
//!
//! let git = Git::locate_default(None).await?;
//! let out = git.exec(builders::tags("/work/repo")).await?;
//! ```

pub mod builders;
pub mod command;
pub mod dedup;
pub mod errors;
pub mod executor;
pub mod mock;
pub mod ops;
pub mod runner;

pub use command::{ErrorHandling, GitCommand};
pub use dedup::CommandDeduplicator;
pub use errors::{GitError, GitWarning, KnownError, RunError};
pub use executor::Git;
pub use ops::CurrentBranch;
pub use runner::{Encoding, Output, ProcessRunner, RunOptions, RunOutput, TokioProcessRunner};
