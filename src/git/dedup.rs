//! git::dedup
//!
//! Sharing of in-flight git invocations.
//!
//! # Architecture
//!
//! The deduplicator owns a map from command signature to the shared future
//! of the process currently running for it. A caller whose signature is
//! already pending awaits that future instead of spawning. Otherwise the
//! process is started on its own tokio task and the entry inserted.
//!
//! # Invariants
//!
//! - Concurrent calls with the same signature observe one process and
//!   identical output.
//! - The entry is removed when the task finishes, whether it succeeded,
//!   failed or panicked. Removal is keyed by an entry id so a late guard never
//!   evicts a newer entry for the same signature.
//! - Dropping a waiting caller never cancels the process; other awaiters
//!   and the map still see it complete.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use super::errors::RunError;
use super::runner::RunOutput;

/// Result shared between all awaiters of one execution.
pub type SharedRun = Shared<BoxFuture<'static, Result<RunOutput, RunError>>>;

struct Pending {
    id: u64,
    run: SharedRun,
}

/// Map of in-flight invocations keyed by signature.
#[derive(Clone, Default)]
pub struct CommandDeduplicator {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for CommandDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDeduplicator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Removes a pending entry when the owning task ends.
struct PendingGuard {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    signature: String,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.get(&self.signature).is_some_and(|p| p.id == self.id) {
            pending.remove(&self.signature);
        }
    }
}

impl CommandDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the pending execution for `signature`, or start one with `start`.
    ///
    /// Returns the result and whether this caller joined an existing
    /// execution.
    pub async fn run<F>(&self, signature: &str, start: F) -> (Result<RunOutput, RunError>, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Result<RunOutput, RunError>>,
    {
        let (run, waited) = self.join_or_start(signature, start);
        (run.await, waited)
    }

    fn join_or_start<F>(&self, signature: &str, start: F) -> (SharedRun, bool)
    where
        F: FnOnce() -> BoxFuture<'static, Result<RunOutput, RunError>>,
    {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = pending.get(signature) {
            return (existing.run.clone(), true);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            signature: signature.to_string(),
            id,
        };
        let process = start();
        let command = signature.to_string();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            process.await
        });

        let run = async move {
            match handle.await {
                Ok(result) => result,
                Err(join) if join.is_cancelled() => Err(RunError::cancelled(command)),
                Err(join) => Err(RunError::exited(
                    command,
                    None,
                    String::new(),
                    format!("git task ended abnormally: {}", join),
                )),
            }
        }
        .boxed()
        .shared();

        pending.insert(
            signature.to_string(),
            Pending {
                id,
                run: run.clone(),
            },
        );
        (run, false)
    }

    /// Number of signatures currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_pending(&self, signature: &str) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains_key(signature))
            .unwrap_or(false)
    }
}
