//! service::refs
//!
//! Branches, tags, stashes, contributors, the current user and the state of
//! merges and rebases in progress.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::GitService;
use crate::cache::{contributors_key, RepositoryChange, RepositoryChangeEvent};
use crate::core::types::rev;
use crate::git::builders::{self, BranchFilter, LogArgs, StashPushArgs};
use crate::git::{Git, GitError};
use crate::models::{
    AheadBehind, Branch, Contributor, DiffShortStat, MergeStatus, RebaseStatus, StateRef, Stash,
    Tag, Upstream, User,
};
use crate::parsers::format::{parse_unix, LogFormat};
use crate::parsers::{parse_branches, parse_log, parse_shortstat, parse_stash, parse_tags, LogContext};
use crate::repository::Repository;

/// Branch names likely to be a repository's base, by preference.
const DEFAULT_BRANCH_WEIGHTS: &[(&str, u32)] = &[
    ("master", 100),
    ("main", 15),
    ("default", 10),
    ("develop", 5),
    ("development", 1),
];

static MAPPED_AUTHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\s<(.*)>$").expect("mailmap pattern compiles"));

impl GitService {
    // ========================================================================
    // Branches
    // ========================================================================

    /// Local and remote branches.
    ///
    /// A repository without commits still reports its current branch.
    pub async fn branches(&self, repo_path: &str) -> Vec<Branch> {
        let this = self.clone();
        let repo = repo_path.to_string();
        self.cached_or_retry(&self.caches.branches, repo_path, move || async move {
            this.branches_core(&repo).await.map(Some)
        })
        .await
        .map(|branches| branches.as_ref().clone())
        .unwrap_or_default()
    }

    /// The checked-out branch, or a description of the detached HEAD.
    pub async fn branch(&self, repo_path: &str) -> Option<Branch> {
        let Some(repository) = self.registry.get(repo_path) else {
            return self.branch_core(repo_path).await;
        };
        let this = self.clone();
        let repo = repo_path.to_string();
        self.cached(&repository.branch, Repository::branch_key(), move || async move {
            Ok(this.branch_core(&repo).await)
        })
        .await
        .map(|branch| branch.as_ref().clone())
    }

    /// Commits `branch` has that its base lacks, as `base..branch`.
    ///
    /// The base is the upstream when the branch is ahead of it; without an
    /// upstream, the most likely default branch.
    pub async fn branch_ahead_range(&self, branch: &Branch) -> Option<String> {
        if branch.ahead > 0 {
            if let Some(upstream) = &branch.upstream {
                return Some(rev::range(&upstream.name, &branch.name));
            }
        }
        if branch.upstream.is_some() {
            return None;
        }

        let branches = self.branches(&branch.repo_path).await;
        let base = heaviest_default_branch(&branches)?;

        let candidate = base
            .upstream
            .as_ref()
            .map(|u| u.name.as_str())
            .unwrap_or(&base.name);
        (candidate != branch.name).then(|| rev::range(candidate, &branch.name))
    }

    /// Branch names containing, or pointing at, `reference`.
    pub async fn commit_branches(
        &self,
        repo_path: &str,
        reference: &str,
        filter: BranchFilter,
        remotes: bool,
    ) -> Vec<String> {
        self.git
            .exec(builders::branch_contains(
                repo_path, reference, filter, None, remotes,
            ))
            .await
            .map(|data| {
                data.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Default branch of `remote`, or the local HEAD branch without one.
    pub async fn default_branch_name(&self, repo_path: &str, remote: Option<&str>) -> Option<String> {
        if remote.is_none() {
            if let Ok(data) = self.git.exec(builders::symbolic_ref(repo_path, "HEAD")).await {
                let name = data.trim();
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
        self.git
            .remote_default_branch(repo_path, remote.unwrap_or("origin"))
            .await
    }

    async fn branches_core(&self, repo_path: &str) -> Result<Vec<Branch>, GitError> {
        let data = self
            .git
            .exec(builders::for_each_ref_branches(repo_path, true))
            .await?;
        if !data.trim().is_empty() {
            return Ok(parse_branches(&data, repo_path));
        }

        debug!("no branches in {}; assuming no commits yet", repo_path);
        Ok(self.synthesized_branch(repo_path).await.into_iter().collect())
    }

    async fn branch_core(&self, repo_path: &str) -> Option<Branch> {
        if let Some(current) = self
            .branches(repo_path)
            .await
            .into_iter()
            .find(|b| b.current)
        {
            return Some(current);
        }
        self.synthesized_branch(repo_path).await
    }

    /// Current branch built from `rev-parse`, for an unborn or detached HEAD.
    async fn synthesized_branch(&self, repo_path: &str) -> Option<Branch> {
        let ordering = self.settings().commit_ordering;
        let current = match self.git.current_branch(repo_path, ordering.as_deref()).await {
            Ok(current) => current?,
            Err(err) => {
                warn!("current branch of {} failed: {}", repo_path, err);
                return None;
            }
        };

        let detached = current.is_detached();
        let (rebase, date) = tokio::join!(
            async {
                if detached {
                    self.rebase_status(repo_path).await
                } else {
                    None
                }
            },
            self.git
                .exec(builders::log_recent_committer_date(repo_path, ordering.as_deref()))
        );

        Some(Branch {
            repo_path: repo_path.to_string(),
            name: rebase
                .as_ref()
                .map(|r| r.head_name.clone())
                .unwrap_or(current.name),
            remote: false,
            current: true,
            sha: current.sha,
            upstream: current.upstream.map(|name| Upstream {
                name,
                missing: false,
            }),
            ahead: 0,
            behind: 0,
            date: date.ok().and_then(|d| parse_unix(d.trim())),
            detached,
            rebasing: rebase.is_some(),
        })
    }

    // ========================================================================
    // Tags and stash
    // ========================================================================

    pub async fn tags(&self, repo_path: &str) -> Vec<Tag> {
        let git = self.git.clone();
        let repo = repo_path.to_string();
        self.cached_or_retry(&self.caches.tags, repo_path, move || async move {
            let data = git.exec(builders::tags(&repo)).await?;
            Ok(Some(parse_tags(&data, &repo)))
        })
        .await
        .map(|tags| tags.as_ref().clone())
        .unwrap_or_default()
    }

    pub async fn stash(&self, repo_path: &str) -> Option<Stash> {
        let git = self.git.clone();
        let repo = repo_path.to_string();
        let similarity = self.settings().similarity_threshold;
        self.cached(&self.caches.stashes, repo_path, move || async move {
            let data = git.exec(builders::stash_list(&repo, similarity)).await?;
            Ok(parse_stash(&data, &repo))
        })
        .await
        .map(|stash| stash.as_ref().clone())
    }

    /// Stash working changes, or only `paths` (repository-relative) when given.
    pub async fn stash_save(
        &self,
        repo_path: &str,
        message: Option<&str>,
        paths: &[String],
        include_untracked: bool,
        keep_index: bool,
    ) -> Result<(), GitError> {
        self.git
            .stash_push(StashPushArgs {
                repo_path,
                message,
                include_untracked,
                keep_index,
                pathspecs: paths,
            })
            .await?;
        self.stash_changed(repo_path, true);
        Ok(())
    }

    /// Apply a stash, removing it when `pop` is set.
    pub async fn stash_apply(&self, repo_path: &str, stash_name: &str, pop: bool) -> Result<(), GitError> {
        let result = self.git.stash_apply(repo_path, stash_name, pop).await;
        // a conflicting apply still touched the working tree
        self.stash_changed(repo_path, true);
        result
    }

    /// Drop a stash. With `sha`, only if `stash_name` still names that commit.
    pub async fn stash_delete(
        &self,
        repo_path: &str,
        stash_name: &str,
        sha: Option<&str>,
    ) -> Result<(), GitError> {
        self.git.stash_drop(repo_path, stash_name, sha).await?;
        self.stash_changed(repo_path, false);
        Ok(())
    }

    fn stash_changed(&self, repo_path: &str, working_tree: bool) {
        let mut changes = vec![RepositoryChange::Stash];
        if working_tree {
            changes.push(RepositoryChange::Index);
        }
        self.on_repository_changed(&RepositoryChangeEvent::new(repo_path, changes));
    }

    // ========================================================================
    // People
    // ========================================================================

    /// Everyone who committed, most commits first. With `stats`, line and
    /// file totals are summed per contributor.
    pub async fn contributors(&self, repo_path: &str, stats: bool) -> Vec<Contributor> {
        let this = self.clone();
        let repo = repo_path.to_string();
        self.cached_or_retry(
            &self.caches.contributors,
            &contributors_key(repo_path, stats),
            move || async move { this.contributors_core(&repo, stats).await.map(Some) },
        )
        .await
        .map(|contributors| contributors.as_ref().clone())
        .unwrap_or_default()
    }

    async fn contributors_core(
        &self,
        repo_path: &str,
        stats: bool,
    ) -> Result<Vec<Contributor>, GitError> {
        let settings = self.settings();
        let (user, data) = tokio::join!(
            self.current_user(repo_path),
            self.git.exec(builders::log(&LogArgs {
                repo_path,
                format: if stats {
                    LogFormat::ShortlogStats
                } else {
                    LogFormat::Shortlog
                },
                all: settings.show_all_branches,
                merges: true,
                ordering: settings.ordering(),
                ..Default::default()
            }))
        );
        let data = data?;

        let Some(log) = parse_log(
            &data,
            &LogContext {
                repo_path,
                limit: None,
            },
        ) else {
            return Ok(Vec::new());
        };

        let mut by_email: HashMap<String, usize> = HashMap::new();
        let mut contributors: Vec<Contributor> = Vec::new();
        for commit in &log.commits {
            let key = if commit.email.is_empty() {
                commit.author.clone()
            } else {
                commit.email.to_lowercase()
            };
            let idx = *by_email.entry(key).or_insert_with(|| {
                contributors.push(Contributor {
                    repo_path: repo_path.to_string(),
                    name: commit.author.clone(),
                    email: commit.email.clone(),
                    commits: 0,
                    additions: stats.then_some(0),
                    deletions: stats.then_some(0),
                    files: stats.then_some(0),
                    current: user
                        .as_ref()
                        .is_some_and(|u| u.matches(&commit.author, &commit.email)),
                });
                contributors.len() - 1
            });

            let contributor = &mut contributors[idx];
            contributor.commits += 1;
            if let (true, Some(s)) = (stats, &commit.stats) {
                contributor.additions = contributor.additions.map(|a| a + s.additions);
                contributor.deletions = contributor.deletions.map(|d| d + s.deletions);
                contributor.files = contributor.files.map(|f| f + s.files);
            }
        }

        contributors.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));
        Ok(contributors)
    }

    /// Identity commits are made with: repository config, then the
    /// environment, then the login name; rewritten through the mailmap.
    pub async fn current_user(&self, repo_path: &str) -> Option<User> {
        let git = self.git.clone();
        let repo = repo_path.to_string();
        self.caches
            .users
            .get_or_compute(repo_path, move || async move {
                Ok(current_user_core(&git, &repo).await)
            })
            .await
            .map(|user| user.as_ref().clone())
    }

    // ========================================================================
    // Merge and rebase
    // ========================================================================

    pub async fn merge_status(&self, repo_path: &str) -> Option<MergeStatus> {
        let this = self.clone();
        let repo = repo_path.to_string();
        self.cached(&self.caches.merge_status, repo_path, move || async move {
            this.merge_status_core(&repo).await
        })
        .await
        .map(|status| status.as_ref().clone())
    }

    async fn merge_status_core(&self, repo_path: &str) -> Result<Option<MergeStatus>, GitError> {
        let Some(merge_head) = self.git.verify(repo_path, "MERGE_HEAD", None).await? else {
            return Ok(None);
        };

        let (branch, merge_base, sources) = tokio::join!(
            self.branch(repo_path),
            self.merge_base(repo_path, "MERGE_HEAD", "HEAD", false),
            self.commit_branches(repo_path, "MERGE_HEAD", BranchFilter::PointsAt, false),
        );

        let head = match branch {
            Some(branch) => StateRef {
                sha: branch.sha.unwrap_or_else(|| "HEAD".to_string()),
                name: Some(branch.name),
            },
            None => StateRef {
                sha: "HEAD".to_string(),
                name: None,
            },
        };

        Ok(Some(MergeStatus {
            repo_path: repo_path.to_string(),
            head,
            incoming: StateRef {
                sha: merge_head,
                name: (sources.len() == 1).then(|| sources[0].clone()),
            },
            merge_base,
        }))
    }

    pub async fn rebase_status(&self, repo_path: &str) -> Option<RebaseStatus> {
        let this = self.clone();
        let repo = repo_path.to_string();
        self.cached(&self.caches.rebase_status, repo_path, move || async move {
            this.rebase_status_core(&repo).await
        })
        .await
        .map(|status| status.as_ref().clone())
    }

    async fn rebase_status_core(&self, repo_path: &str) -> Result<Option<RebaseStatus>, GitError> {
        if self.git.verify(repo_path, "REBASE_HEAD", None).await?.is_none() {
            return Ok(None);
        }

        let git = &self.git;
        let (merge_base, head_name, onto, step, steps, message) = tokio::join!(
            self.merge_base(repo_path, "REBASE_HEAD", "HEAD", false),
            git.read_dot_git_file(repo_path, &["rebase-merge", "head-name"]),
            git.read_dot_git_file(repo_path, &["rebase-merge", "onto"]),
            git.read_dot_git_number(repo_path, &["rebase-merge", "msgnum"]),
            git.read_dot_git_number(repo_path, &["rebase-merge", "end"]),
            async {
                match git.read_dot_git_file(repo_path, &["rebase-merge", "message"]).await {
                    Some(message) => Some(message),
                    None => {
                        git.read_dot_git_file(repo_path, &["rebase-merge", "message-squashed"])
                            .await
                    }
                }
            },
        );

        let (Some(head_name), Some(onto)) = (head_name, onto) else {
            return Ok(None);
        };
        let head_name = head_name
            .strip_prefix("refs/heads/")
            .unwrap_or(&head_name)
            .trim()
            .to_string();

        let onto_name = self
            .commit_branches(repo_path, &onto, BranchFilter::PointsAt, false)
            .await
            .into_iter()
            .find(|b| !b.starts_with("(no branch, rebasing"));

        Ok(Some(RebaseStatus {
            repo_path: repo_path.to_string(),
            head_name,
            onto: StateRef {
                sha: onto,
                name: onto_name,
            },
            merge_base,
            step,
            steps,
            message: message.filter(|m| !m.is_empty()),
        }))
    }

    // ========================================================================
    // Counts
    // ========================================================================

    pub async fn merge_base(
        &self,
        repo_path: &str,
        ref1: &str,
        ref2: &str,
        fork_point: bool,
    ) -> Option<String> {
        self.git
            .merge_base(repo_path, ref1, ref2, fork_point)
            .await
            .unwrap_or_else(|err| {
                warn!("merge-base {} {} failed: {}", ref1, ref2, err);
                None
            })
    }

    pub async fn commit_count(&self, repo_path: &str, reference: &str) -> Option<u32> {
        self.git
            .rev_list_count(repo_path, reference)
            .await
            .ok()
            .flatten()
    }

    /// Commits on each side of `left...right`.
    pub async fn ahead_behind(&self, repo_path: &str, range: &str) -> Option<AheadBehind> {
        self.git.ahead_behind(repo_path, range).await.ok().flatten()
    }

    /// Files and lines changed in the working tree, or against `reference`.
    pub async fn changes_shortstat(
        &self,
        repo_path: &str,
        reference: Option<&str>,
    ) -> Option<DiffShortStat> {
        let data = self
            .git
            .diff_shortstat(repo_path, reference)
            .await
            .map_err(|err| warn!("shortstat of {} failed: {}", repo_path, err))
            .ok()??;
        parse_shortstat(&data)
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

async fn current_user_core(git: &Git, repo_path: &str) -> Option<User> {
    let mut user = User::default();

    match git.config_get_regex(repo_path, r"^user\.").await {
        Some(data) => {
            for line in data.lines() {
                match line.split_once(' ') {
                    Some(("user.name", value)) => user.name = Some(value.to_string()),
                    Some(("user.email", value)) => user.email = Some(value.to_string()),
                    _ => {}
                }
            }
        }
        None => {
            let name = env_first(&["GIT_AUTHOR_NAME", "GIT_COMMITTER_NAME", "USER", "USERNAME"])?;
            let email = env_first(&["GIT_AUTHOR_EMAIL", "GIT_COMMITTER_EMAIL", "EMAIL"])
                .unwrap_or_else(|| {
                    let host = env_first(&["HOSTNAME", "COMPUTERNAME"])
                        .unwrap_or_else(|| "localhost".to_string());
                    format!("{}@{}", name, host)
                });
            user.name = Some(name);
            user.email = Some(email);
        }
    }

    if let (Some(name), Some(email)) = (&user.name, &user.email) {
        let author = format!("{} <{}>", name, email);
        if let Ok(mapped) = git.exec(builders::check_mailmap(repo_path, &author)).await {
            let mapped = mapped.trim();
            if !mapped.is_empty() && mapped != author {
                if let Some(caps) = MAPPED_AUTHOR.captures(mapped) {
                    user.name = Some(caps[1].to_string());
                    user.email = Some(caps[2].to_string());
                }
            }
        }
    }

    Some(user)
}

/// The branch with the highest default-name weight; the first seen wins ties.
fn heaviest_default_branch(branches: &[Branch]) -> Option<&Branch> {
    let weight = |name: &str| {
        DEFAULT_BRANCH_WEIGHTS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, w)| *w)
    };
    branches
        .iter()
        .filter_map(|b| weight(&b.name).map(|w| (w, b)))
        .fold(None, |best: Option<(u32, &Branch)>, (w, b)| match best {
            Some((top, _)) if top >= w => best,
            _ => Some((w, b)),
        })
        .map(|(_, b)| b)
}
