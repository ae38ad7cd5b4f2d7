//! git::ops
//!
//! Operations that need more than one invocation: fallbacks, retries and
//! probes layered over the builders.
//!
//! Single-invocation operations are run directly with
//! [`Git::exec`](super::Git::exec) by the service.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::builders::{self, BlameArgs, DiffArgs, StashPushArgs};
use super::command::ErrorHandling;
use super::errors::{GitError, GitWarning, KnownError};
use super::executor::Git;
use super::runner::{Encoding, Output};
use crate::core::paths::{self, normalize_path};
use crate::core::types::rev;
use crate::core::version::requirements;
use crate::models::{AheadBehind, Branch};
use crate::parsers::refs::parse_left_right_count;

static LS_REMOTE_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)ref:\s(\S+)\s+HEAD").expect("ls-remote pattern compiles"));

static BRANCH_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^branch\..+\.remote\s(.+)$").expect("branch remote pattern compiles")
});

static BRANCH_MERGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^branch\..+\.merge\srefs/heads/(.+)$").expect("branch merge pattern compiles")
});

/// Result of the current-branch lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentBranch {
    /// Branch name, or `(HEAD detached at <short>)`
    pub name: String,
    pub upstream: Option<String>,
    /// Set for a detached HEAD
    pub sha: Option<String>,
}

impl CurrentBranch {
    pub fn is_detached(&self) -> bool {
        self.sha.is_some()
    }
}

fn trimmed(data: String) -> Option<String> {
    let data = data.trim();
    (!data.is_empty()).then(|| data.to_string())
}

impl Git {
    // ========================================================================
    // Blame / diff / show
    // ========================================================================

    /// Incremental blame. Drops an unusable `--ignore-revs-file` and reads
    /// index contents for the staged revision.
    pub async fn blame(&self, args: BlameArgs<'_>) -> Result<String, GitError> {
        let ignore_revs_usable = self.ignore_revs_usable(args.repo_path, args.custom_args).await;

        let staged = match args.reference {
            Some(r) if rev::is_uncommitted_staged(r) => self
                .show(args.repo_path, args.file, rev::STAGED_SHORTHAND, Encoding::Utf8)
                .await?
                .map(Output::into_text),
            _ => None,
        };

        self.exec(builders::blame(&BlameArgs {
            ignore_revs_usable,
            staged_contents: staged.as_deref(),
            ..args
        }))
        .await
    }

    /// Blame of unsaved contents.
    pub async fn blame_contents(
        &self,
        args: BlameArgs<'_>,
        contents: &str,
        correlation_key: &str,
    ) -> Result<String, GitError> {
        let ignore_revs_usable = self.ignore_revs_usable(args.repo_path, args.custom_args).await;
        self.exec(builders::blame_contents(
            &BlameArgs {
                ignore_revs_usable,
                ..args
            },
            contents,
            correlation_key,
        ))
        .await
    }

    async fn ignore_revs_usable(&self, repo_path: Option<&str>, custom_args: &[String]) -> bool {
        let Some(file) = builders::ignore_revs_file(custom_args) else {
            return false;
        };
        if !self
            .version()
            .at_least_version(requirements::BLAME_IGNORE_REVS_FILE)
        {
            return false;
        }
        let path = if Path::new(file).is_absolute() {
            PathBuf::from(file)
        } else {
            Path::new(repo_path.unwrap_or_default()).join(file)
        };
        self.probe_file(&path).await
    }

    /// Diff of one file. When the first ref is a parent (`<sha>^`) that does
    /// not exist, the file was added by a root commit: retry once against
    /// the empty tree.
    pub async fn diff(&self, args: DiffArgs<'_>) -> Result<String, GitError> {
        match self.exec(builders::diff(&args)).await {
            Ok(data) => Ok(data),
            Err(err) => {
                let bad = err
                    .as_run()
                    .and_then(|e| KnownError::BadRevision.capture(e.message()));
                match (bad, args.ref1) {
                    (Some(bad), Some(ref1)) if bad == ref1 && ref1.ends_with('^') => {
                        debug!("diff: {} has no parent, retrying against the empty tree", ref1);
                        self.exec(builders::diff(&DiffArgs {
                            ref1: Some(rev::ROOT_EMPTY_TREE_SHA),
                            ..args
                        }))
                        .await
                    }
                    _ => Err(err),
                }
            }
        }
    }

    /// Diff of a tracked file against `contents`. `--no-index` exits 1 when
    /// the inputs differ, so stdout of a failed run is the answer.
    pub async fn diff_contents(
        &self,
        repo_path: &str,
        file: &str,
        contents: &str,
        similarity: Option<u8>,
    ) -> Result<String, GitError> {
        match self
            .exec(builders::diff_contents(repo_path, file, contents, similarity, ""))
            .await
        {
            Ok(data) => Ok(data),
            Err(GitError::Run(err)) if !err.stdout.is_empty() => Ok(err.stdout),
            Err(err) => Err(err),
        }
    }

    /// `diff --shortstat`; `None` when the refs share no history.
    pub async fn diff_shortstat(
        &self,
        repo_path: &str,
        reference: Option<&str>,
    ) -> Result<Option<String>, GitError> {
        match self.exec(builders::diff_shortstat(repo_path, reference)).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.is(KnownError::NoMergeBase) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// File contents at a revision.
    ///
    /// `None` when the path does not exist at that revision. Reading the
    /// index (`:`) falls back to `HEAD:` when the index has no entry.
    pub async fn show(
        &self,
        repo_path: Option<&str>,
        file: &str,
        reference: &str,
        encoding: Encoding,
    ) -> Result<Option<Output>, GitError> {
        let staged = rev::is_uncommitted_staged(reference) || reference == rev::STAGED_SHORTHAND;
        if !staged && rev::is_uncommitted(reference) {
            return Err(GitError::UncommittedRef {
                path: file.to_string(),
            });
        }

        let result = self
            .exec_output(builders::show(repo_path, file, reference, encoding))
            .await;

        let err = match result {
            Ok(output) => return Ok(Some(output)),
            Err(err) => err,
        };

        if staged && err.is(KnownError::BadRevision) {
            return Box::pin(self.show(repo_path, file, "HEAD:", encoding)).await;
        }

        // NotFound, FoundButNotInRevision and friends: the path is not there
        if err.is(KnownError::BadRevision) || err.warning().is_some() {
            return Ok(None);
        }
        Err(err)
    }

    // ========================================================================
    // Refs
    // ========================================================================

    /// Current branch, with fallbacks for repositories without commits,
    /// without an upstream, and with a detached HEAD.
    pub async fn current_branch(
        &self,
        repo_path: &str,
        ordering: Option<&str>,
    ) -> Result<Option<CurrentBranch>, GitError> {
        let err = match self
            .exec(builders::rev_parse_current_branch(repo_path))
            .await
        {
            Ok(data) => return Ok(Self::branch_from_rev_parse(&data)),
            Err(err) => err,
        };

        if err.is(KnownError::BadRevision) || err.warning() == Some(GitWarning::NoUpstream) {
            if let Some(stdout) = err.as_run().map(|e| e.stdout.trim()).filter(|s| !s.is_empty()) {
                return Ok(Self::branch_from_rev_parse(stdout));
            }
            return Ok(Some(self.default_branch_fallback(repo_path).await));
        }

        if err.warning() == Some(GitWarning::HeadNotABranch) {
            let Some(sha) = trimmed(self.exec(builders::log_recent(repo_path, ordering)).await?)
            else {
                return Ok(None);
            };
            return Ok(Some(CurrentBranch {
                name: Branch::detached_name(&sha),
                upstream: None,
                sha: Some(sha),
            }));
        }

        if err.warning().is_some() {
            return Ok(None);
        }
        Err(err)
    }

    fn branch_from_rev_parse(data: &str) -> Option<CurrentBranch> {
        let (name, upstream) = crate::parsers::parse_current_branch(data)?;
        Some(CurrentBranch {
            name,
            upstream,
            sha: None,
        })
    }

    /// Branch for a repository whose HEAD cannot be resolved yet.
    async fn default_branch_fallback(&self, repo_path: &str) -> CurrentBranch {
        let named = |name: String| CurrentBranch {
            name,
            upstream: None,
            sha: None,
        };

        if let Ok(data) = self
            .exec(builders::symbolic_ref(repo_path, "HEAD").errors(ErrorHandling::Throw))
            .await
        {
            if let Some(name) = trimmed(data) {
                return named(name);
            }
        }

        match self
            .exec(
                builders::symbolic_ref(repo_path, "refs/remotes/origin/HEAD")
                    .errors(ErrorHandling::Throw),
            )
            .await
        {
            Ok(data) => {
                if let Some(name) = trimmed(data) {
                    let name = name.strip_prefix("origin/").unwrap_or(&name).to_string();
                    return named(name);
                }
            }
            Err(err)
                if err
                    .as_run()
                    .is_some_and(|e| e.stderr.contains("is not a symbolic ref")) =>
            {
                if let Some(branch) = self.remote_default_branch(repo_path, "origin").await {
                    return named(branch);
                }
            }
            Err(_) => {}
        }

        let default = self
            .config_get(repo_path, "init.defaultBranch")
            .await
            .unwrap_or_else(|| "main".to_string());
        let config = self
            .config_get_regex(repo_path, &format!(r"branch\.{}\.+", regex::escape(&default)))
            .await;

        let upstream = config.and_then(|config| {
            let remote = BRANCH_REMOTE.captures(&config)?.get(1)?.as_str().to_string();
            let branch = BRANCH_MERGE.captures(&config)?.get(1)?.as_str().to_string();
            Some(format!("{}/{}", remote, branch))
        });

        CurrentBranch {
            name: default,
            upstream,
            sha: None,
        }
    }

    /// Default branch of `remote` as advertised by `ls-remote --symref`.
    pub async fn remote_default_branch(&self, repo_path: &str, remote: &str) -> Option<String> {
        let data = self
            .exec(builders::ls_remote_head(repo_path, remote))
            .await
            .ok()?;
        let branch = LS_REMOTE_HEAD.captures(&data)?.get(1)?.as_str();
        Some(branch.strip_prefix("refs/heads/").unwrap_or(branch).to_string())
    }

    /// Root of the working tree containing `cwd`.
    ///
    /// A missing `cwd` is retried from its nearest existing ancestor. When
    /// `cwd` sits under a symlink, the toplevel is rewritten to keep the
    /// caller's spelling of the path.
    pub async fn show_toplevel(&self, cwd: &str) -> Result<Option<String>, GitError> {
        let original = normalize_path(cwd);
        let mut cwd = original.clone();
        if !tokio::fs::try_exists(&cwd).await.unwrap_or(false) {
            match paths::nearest_existing(Path::new(&cwd)) {
                Some(existing) => cwd = paths::normalize(&existing),
                None => return Ok(None),
            }
        }

        loop {
            match self.exec(builders::rev_parse_show_toplevel(&cwd)).await {
                Ok(data) => {
                    let data = data.trim_start().trim_end_matches(['\r', '\n']);
                    if data.is_empty() {
                        return Ok(None);
                    }
                    let toplevel = normalize_path(data);
                    return Ok(Some(self.preserve_symlinked_root(&toplevel, &cwd).await));
                }
                Err(err) => {
                    let in_dot_git = err.warning() == Some(GitWarning::MustRunInWorkTree);
                    let vanished = err.as_run().is_some_and(|e| e.is_not_found());
                    if !in_dot_git && !vanished {
                        debug!("{} is not inside a repository", original);
                        return Ok(None);
                    }

                    let parent = Path::new(&cwd).parent().and_then(paths::nearest_existing);
                    match parent.map(|p| paths::normalize(&p)) {
                        Some(parent) if parent != cwd => cwd = parent,
                        _ => return Ok(None),
                    }
                }
            }
        }
    }

    async fn preserve_symlinked_root(&self, toplevel: &str, cwd: &str) -> String {
        let Ok(real) = tokio::fs::canonicalize(cwd).await else {
            return toplevel.to_string();
        };
        let real = paths::normalize(&real);
        let original = normalize_path(cwd);
        if real == original {
            return toplevel.to_string();
        }
        paths::preserve_symlink(toplevel, &original, &real)
    }

    /// Full sha of a commit, or of a blob with `file`.
    pub async fn verify(
        &self,
        repo_path: &str,
        reference: &str,
        file: Option<&str>,
    ) -> Result<Option<String>, GitError> {
        Ok(trimmed(
            self.exec(builders::rev_parse_verify(repo_path, reference, file))
                .await?,
        ))
    }

    pub async fn merge_base(
        &self,
        repo_path: &str,
        ref1: &str,
        ref2: &str,
        fork_point: bool,
    ) -> Result<Option<String>, GitError> {
        match self
            .exec(builders::merge_base(repo_path, ref1, ref2, fork_point))
            .await
        {
            Ok(data) => Ok(trimmed(data).and_then(|d| d.lines().next().map(str::to_string))),
            Err(err) if err.is(KnownError::NoMergeBase) || err.as_run().is_some_and(|e| e.exit_code == Some(1)) => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn rev_list_count(&self, repo_path: &str, reference: &str) -> Result<Option<u32>, GitError> {
        let data = self.exec(builders::rev_list_count(repo_path, reference)).await?;
        Ok(data.trim().parse().ok())
    }

    pub async fn ahead_behind(&self, repo_path: &str, range: &str) -> Result<Option<AheadBehind>, GitError> {
        let data = self
            .exec(builders::rev_list_left_right(repo_path, &[range]))
            .await?;
        Ok(parse_left_right_count(&data))
    }

    /// Whether `name` is a valid branch name (or ref with `branch == false`).
    pub async fn check_ref_format(&self, repo_path: &str, name: &str, branch: bool) -> bool {
        self.exec(builders::check_ref_format(repo_path, name, branch))
            .await
            .is_ok_and(|data| !data.trim().is_empty())
    }

    pub async fn config_get(&self, repo_path: &str, key: &str) -> Option<String> {
        self.exec(builders::config_get(repo_path, key))
            .await
            .ok()
            .and_then(trimmed)
    }

    pub async fn config_get_regex(&self, repo_path: &str, pattern: &str) -> Option<String> {
        self.exec(builders::config_get_regex(repo_path, pattern))
            .await
            .ok()
            .and_then(trimmed)
    }

    // ========================================================================
    // Stash
    // ========================================================================

    pub async fn stash_push(&self, args: StashPushArgs<'_>) -> Result<(), GitError> {
        let command = builders::stash_push(&args, self.version())?;
        self.exec(command.errors(ErrorHandling::Throw)).await?;
        Ok(())
    }

    /// Drop a stash. With `expected_sha`, refuses when the selector has since
    /// moved to another stash.
    pub async fn stash_drop(
        &self,
        repo_path: &str,
        stash_name: &str,
        expected_sha: Option<&str>,
    ) -> Result<(), GitError> {
        if stash_name.is_empty() {
            return Ok(());
        }
        if let Some(expected) = expected_sha {
            let actual = self
                .exec(builders::stash_sha(repo_path, stash_name))
                .await?
                .trim()
                .to_string();
            if actual != expected {
                return Err(GitError::StashMismatch {
                    stash: stash_name.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        self.exec(builders::stash_drop(repo_path, stash_name).errors(ErrorHandling::Throw))
            .await?;
        Ok(())
    }

    pub async fn stash_apply(&self, repo_path: &str, stash_name: &str, pop: bool) -> Result<(), GitError> {
        if stash_name.is_empty() {
            return Ok(());
        }
        self.exec(builders::stash_apply(repo_path, stash_name, pop).errors(ErrorHandling::Throw))
            .await?;
        Ok(())
    }

    // ========================================================================
    // .git side files
    // ========================================================================

    /// Contents of `<repo>/.git/<parts...>`, trimmed. `None` when unreadable.
    pub async fn read_dot_git_file(&self, repo_path: &str, parts: &[&str]) -> Option<String> {
        let mut path = PathBuf::from(repo_path).join(".git");
        path.extend(parts);
        let contents = tokio::fs::read_to_string(&path).await.ok()?;
        Some(contents.trim().to_string())
    }

    /// Numeric side file, e.g. `rebase-merge/msgnum`.
    pub async fn read_dot_git_number(&self, repo_path: &str, parts: &[&str]) -> Option<u32> {
        self.read_dot_git_file(repo_path, parts).await?.parse().ok()
    }
}
