//! git::executor
//!
//! Runs [`GitCommand`]s through the deduplicator and applies the command's
//! error-handling mode.
//!
//! # Architecture
//!
//! [`Git`] is a cheap handle: the runner, the pending-command map and the
//! detected version are shared behind `Arc`s, so clones issued to different
//! tasks still deduplicate against each other.
//!
//! ```text
//! builder ──► GitCommand ──► Git::exec ──► CommandDeduplicator ──► ProcessRunner
//!                               │
//!                               └─ failure ──► ErrorHandling (Default / Ignore / Throw)
//! ```
//!
//! # Error handling
//!
//! - `Ignore`: any failure is empty output.
//! - `Throw`: every failure propagates as [`GitError::Run`].
//! - `Default`: failures matching a [`GitWarning`] are empty output and
//!   logged at warn level; a bad revision on a stash's `^3` parent is empty
//!   output; anything else is logged at error level and propagates.
//!
//! A command's `timeout` bounds only the caller's wait. On expiry the caller
//! gets [`GitError::Timeout`] while the shared process keeps running for
//! every other awaiter.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, error, warn};

use super::command::{ErrorHandling, GitCommand};
use super::dedup::CommandDeduplicator;
use super::errors::{GitError, GitWarning, KnownError, RunError};
use super::runner::{Output, ProcessRunner, RunOptions, TokioProcessRunner};
use crate::core::types::rev;
use crate::core::version::GitVersion;

/// Environment added to every invocation.
const GIT_ENV: [(&str, &str); 3] = [
    ("GCM_INTERACTIVE", "NEVER"),
    ("GCM_PRESERVE_CREDS", "TRUE"),
    ("LC_ALL", "C"),
];

/// Handle for running git.
#[derive(Clone)]
pub struct Git {
    runner: Arc<dyn ProcessRunner>,
    dedup: CommandDeduplicator,
    git_path: Arc<str>,
    version: GitVersion,
    /// Existence of `--ignore-revs-file` targets, probed once per path
    pub(super) ignore_revs_files: Arc<Mutex<HashMap<String, bool>>>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("git_path", &self.git_path)
            .field("version", &self.version)
            .field("dedup", &self.dedup)
            .finish()
    }
}

impl Git {
    /// Handle with a known version; no process is started.
    pub fn new(runner: Arc<dyn ProcessRunner>, git_path: &str, version: GitVersion) -> Self {
        Self {
            runner,
            dedup: CommandDeduplicator::new(),
            git_path: Arc::from(git_path),
            version,
            ignore_revs_files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Find git at `git_path` (default `git` on `PATH`) and detect its version.
    pub async fn locate(
        runner: Arc<dyn ProcessRunner>,
        git_path: Option<&str>,
    ) -> Result<Self, GitError> {
        let start = Instant::now();
        let path = git_path.filter(|p| !p.is_empty()).unwrap_or("git");
        let output = runner
            .run(path, &["--version".to_string()], &Self::run_options_for(&[], None))
            .await?
            .stdout
            .into_text();

        let version = GitVersion::parse(&output).ok_or_else(|| {
            GitError::Io(format!("unrecognized `git --version` output: {}", output.trim()))
        })?;

        debug!(
            "Git found: {} @ {} · {} ms",
            version,
            if path == "git" { "PATH" } else { path },
            start.elapsed().as_millis()
        );
        Ok(Self::new(runner, path, version))
    }

    /// [`locate`](Self::locate) with the tokio process runner.
    pub async fn locate_default(git_path: Option<&str>) -> Result<Self, GitError> {
        Self::locate(Arc::new(TokioProcessRunner::new()), git_path).await
    }

    pub fn version(&self) -> GitVersion {
        self.version
    }

    pub fn path(&self) -> &str {
        &self.git_path
    }

    pub fn deduplicator(&self) -> &CommandDeduplicator {
        &self.dedup
    }

    fn run_options_for(env: &[(String, String)], command: Option<&GitCommand>) -> RunOptions {
        let mut vars: Vec<(String, String)> = GIT_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.extend(env.iter().cloned());

        match command {
            Some(command) => RunOptions {
                cwd: command.cwd.clone(),
                env: vars,
                stdin: command.stdin.clone(),
                encoding: command.encoding,
            },
            None => RunOptions {
                env: vars,
                ..Default::default()
            },
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run and return stdout as text.
    pub async fn exec(&self, command: GitCommand) -> Result<String, GitError> {
        Ok(self.exec_output(command).await?.into_text())
    }

    /// Run and return stdout as raw bytes.
    pub async fn exec_bytes(&self, command: GitCommand) -> Result<Vec<u8>, GitError> {
        Ok(self.exec_output(command).await?.into_bytes())
    }

    /// Run `command`, sharing the process with identical in-flight commands.
    pub async fn exec_output(&self, command: GitCommand) -> Result<Output, GitError> {
        let start = Instant::now();
        let signature = command.signature();

        let runner = Arc::clone(&self.runner);
        let executable = Arc::clone(&self.git_path);
        let argv = command.argv();
        let options = Self::run_options_for(&command.env, Some(&command));

        let run = self.dedup.run(&signature, move || {
            async move { runner.run(&executable, &argv, &options).await }.boxed()
        });

        // the process runs on its own task; giving up here only drops this waiter
        let (result, waited) = match command.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(done) => done,
                Err(_) => {
                    warn!(
                        "{} · gave up after {} ms",
                        command,
                        start.elapsed().as_millis()
                    );
                    return Err(GitError::Timeout(limit));
                }
            },
            None => run.await,
        };

        let elapsed = start.elapsed().as_millis();
        let waited = if waited { " (waited)" } else { "" };

        match result {
            Ok(output) => {
                debug!("{} · {} ms{}", command, elapsed, waited);
                Ok(output.stdout)
            }
            Err(err) if err.cancelled => {
                debug!("{} · cancelled {} ms{}", command, elapsed, waited);
                Err(GitError::Cancelled(command.to_string()))
            }
            Err(err) => self.handle_failure(&command, err, elapsed, waited),
        }
    }

    fn handle_failure(
        &self,
        command: &GitCommand,
        err: RunError,
        elapsed: u128,
        waited: &str,
    ) -> Result<Output, GitError> {
        let empty = || Output::decode(Vec::new(), command.encoding);

        match command.errors {
            ErrorHandling::Ignore => {
                debug!("{} · ignored failure · {} ms{}", command, elapsed, waited);
                Ok(empty())
            }
            ErrorHandling::Throw => {
                debug!("{} · FAILED {} ms{}", command, elapsed, waited);
                Err(err.into())
            }
            ErrorHandling::Default => {
                if GitWarning::classify(err.message()).is_some() {
                    warn!(
                        "[{}] Git {} · {} ms{}",
                        command.cwd.display(),
                        err.cleaned_message(),
                        elapsed,
                        waited
                    );
                    return Ok(empty());
                }

                // untracked-files parent of a stash; older gits report it as missing
                if KnownError::BadRevision
                    .capture(err.message())
                    .is_some_and(|r| r.ends_with(rev::ROOT_PARENT_MARKER))
                {
                    return Ok(empty());
                }

                error!(
                    "[{}] Git {} · {} ms{}",
                    command.cwd.display(),
                    err.cleaned_message(),
                    elapsed,
                    waited
                );
                Err(err.into())
            }
        }
    }

    /// Whether `path` exists, cached per path for the life of this handle.
    pub(super) async fn probe_file(&self, path: &Path) -> bool {
        let key = path.to_string_lossy().into_owned();
        if let Some(known) = self
            .ignore_revs_files
            .lock()
            .ok()
            .and_then(|map| map.get(&key).copied())
        {
            return known;
        }

        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        if let Ok(mut map) = self.ignore_revs_files.lock() {
            map.insert(key, exists);
        }
        exists
    }
}
