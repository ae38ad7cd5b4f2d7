//! Branches, tags, remotes, revision lookups and stashes.

use crate::core::version::{requirements, GitVersion};
use crate::git::command::{ErrorHandling, GitCommand};
use crate::git::errors::GitError;
use crate::parsers::format;

use super::{find_renames, MAX_ARGS_LENGTH};

/// Whether `branch` lists branches containing a ref or pointing at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchFilter {
    #[default]
    Contains,
    PointsAt,
}

/// Branch names containing (or pointing at) `reference`.
pub fn branch_contains(
    repo_path: &str,
    reference: &str,
    filter: BranchFilter,
    name: Option<&str>,
    remotes: bool,
) -> GitCommand {
    let mut params: Vec<String> = vec!["branch".into()];
    if remotes {
        params.push("-r".into());
    }
    params.push(match filter {
        BranchFilter::Contains => format!("--contains={}", reference),
        BranchFilter::PointsAt => format!("--points-at={}", reference),
    });
    params.push("--format=%(refname:short)".into());
    params.extend(name.map(str::to_string));

    GitCommand::new(repo_path, params)
        .config("color.branch", "false")
        .errors(ErrorHandling::Ignore)
}

/// `check-ref-format --branch <name>` or `--normalize <ref>`.
pub fn check_ref_format(repo_path: &str, reference: &str, branch: bool) -> GitCommand {
    let mode = if branch { "--branch" } else { "--normalize" };
    GitCommand::new(repo_path, ["check-ref-format", mode, reference]).errors(ErrorHandling::Throw)
}

/// Local branches, and remote ones with `all`.
pub fn for_each_ref_branches(repo_path: &str, all: bool) -> GitCommand {
    let mut params = vec![
        "for-each-ref".to_string(),
        format!("--format={}", format::BRANCH),
        "refs/heads".into(),
    ];
    if all {
        params.push("refs/remotes".into());
    }
    GitCommand::new(repo_path, params)
}

pub fn ls_remote(repo_path: &str, remote: &str, reference: Option<&str>) -> GitCommand {
    let mut params = vec!["ls-remote".to_string(), remote.to_string()];
    params.extend(reference.map(str::to_string));
    GitCommand::new(repo_path, params)
}

/// The branch a remote's HEAD points at.
pub fn ls_remote_head(repo_path: &str, remote: &str) -> GitCommand {
    GitCommand::new(repo_path, ["ls-remote", "--symref", remote, "HEAD"])
}

pub fn merge_base(repo_path: &str, ref1: &str, ref2: &str, fork_point: bool) -> GitCommand {
    let mut params = vec!["merge-base".to_string()];
    if fork_point {
        params.push("--fork-point".into());
    }
    params.extend([ref1.to_string(), ref2.to_string()]);
    GitCommand::new(repo_path, params)
}

pub fn remotes(repo_path: &str) -> GitCommand {
    GitCommand::new(repo_path, ["remote", "-v"])
}

pub fn remote_get_url(repo_path: &str, remote: &str) -> GitCommand {
    GitCommand::new(repo_path, ["remote", "get-url", remote])
}

pub fn rev_list_count(repo_path: &str, reference: &str) -> GitCommand {
    GitCommand::new(repo_path, ["rev-list", "--count", reference, "--"]).errors(ErrorHandling::Ignore)
}

/// `rev-list --left-right --count <refs> --`; pass a symmetric range (`a...b`).
pub fn rev_list_left_right(repo_path: &str, refs: &[&str]) -> GitCommand {
    let mut params = vec![
        "rev-list".to_string(),
        "--left-right".into(),
        "--count".into(),
    ];
    params.extend(refs.iter().map(|r| r.to_string()));
    params.push("--".into());
    GitCommand::new(repo_path, params).errors(ErrorHandling::Ignore)
}

/// Current branch and its upstream. Fails on detached HEAD or a missing
/// upstream; the caller runs the fallback chain.
pub fn rev_parse_current_branch(repo_path: &str) -> GitCommand {
    GitCommand::new(
        repo_path,
        [
            "rev-parse",
            "--abbrev-ref",
            "--symbolic-full-name",
            "@",
            "@{u}",
            "--",
        ],
    )
    .errors(ErrorHandling::Throw)
}

pub fn rev_parse_show_toplevel(cwd: &str) -> GitCommand {
    GitCommand::new(cwd, ["rev-parse", "--show-toplevel"]).errors(ErrorHandling::Throw)
}

/// Resolve a commit, or a blob when `file` is given.
pub fn rev_parse_verify(repo_path: &str, reference: &str, file: Option<&str>) -> GitCommand {
    let object = match file {
        Some(file) => format!("{}:./{}", reference, file),
        None => format!("{}^{{commit}}", reference),
    };
    GitCommand::new(repo_path, ["rev-parse".to_string(), "--verify".into(), object])
        .errors(ErrorHandling::Ignore)
}

pub fn show_ref_tags(repo_path: &str) -> GitCommand {
    GitCommand::new(repo_path, ["show-ref", "--tags"]).errors(ErrorHandling::Ignore)
}

pub fn symbolic_ref(repo_path: &str, reference: &str) -> GitCommand {
    GitCommand::new(repo_path, ["symbolic-ref", "--short", reference])
}

pub fn tags(repo_path: &str) -> GitCommand {
    GitCommand::new(
        repo_path,
        ["tag".to_string(), "-l".into(), format!("--format={}", format::TAG)],
    )
}

// ============================================================================
// stash
// ============================================================================

/// `stash apply` or, with `pop`, `stash pop`.
pub fn stash_apply(repo_path: &str, stash_name: &str, pop: bool) -> GitCommand {
    let action = if pop { "pop" } else { "apply" };
    GitCommand::new(repo_path, ["stash", action, stash_name])
}

pub fn stash_drop(repo_path: &str, stash_name: &str) -> GitCommand {
    GitCommand::new(repo_path, ["stash", "drop", stash_name])
}

/// Sha a stash selector currently resolves to.
pub fn stash_sha(repo_path: &str, stash_name: &str) -> GitCommand {
    GitCommand::new(repo_path, ["show", "--format=%H", "--no-patch", stash_name])
        .errors(ErrorHandling::Ignore)
}

pub fn stash_list(repo_path: &str, similarity: Option<u8>) -> GitCommand {
    GitCommand::new(
        repo_path,
        [
            "stash".to_string(),
            "list".into(),
            "--name-status".into(),
            find_renames(similarity),
            format!("--format={}", format::STASH),
        ],
    )
}

#[derive(Debug, Clone, Default)]
pub struct StashPushArgs<'a> {
    pub repo_path: &'a str,
    pub message: Option<&'a str>,
    pub include_untracked: bool,
    pub keep_index: bool,
    /// Repository-relative paths; empty stashes everything
    pub pathspecs: &'a [String],
}

/// `stash push`, passing pathspecs on stdin when git supports it.
///
/// Stashing individual files needs git 2.13.2. Without stdin pathspecs
/// (git < 2.30) a pathspec list longer than [`MAX_ARGS_LENGTH`] cannot be
/// sent and is reported as a version requirement.
pub fn stash_push(args: &StashPushArgs<'_>, version: GitVersion) -> Result<GitCommand, GitError> {
    let mut params: Vec<String> = vec!["stash".into(), "push".into()];
    if args.include_untracked || !args.pathspecs.is_empty() {
        params.push("-u".into());
    }
    if args.keep_index {
        params.push("-k".into());
    }
    if let Some(message) = args.message.filter(|m| !m.is_empty()) {
        params.push("-m".into());
        params.push(message.to_string());
    }

    if args.pathspecs.is_empty() {
        params.push("--".into());
        return Ok(GitCommand::new(args.repo_path, params));
    }

    version.ensure(
        requirements::STASH_PATHSPECS,
        "Stashing individual files",
        " Please retry by stashing everything or install a more recent version of Git.",
    )?;

    let pathspecs: Vec<String> = args.pathspecs.iter().map(|p| format!("./{}", p)).collect();

    if version.at_least_version(requirements::PATHSPEC_FROM_STDIN) {
        params.push("--pathspec-from-file=-".into());
        params.push("--pathspec-file-nul".into());
        return Ok(GitCommand::new(args.repo_path, params).stdin(pathspecs.join("\0").into_bytes()));
    }

    let length: usize = pathspecs.iter().map(String::len).sum();
    if length > MAX_ARGS_LENGTH {
        version.ensure(
            requirements::PATHSPEC_FROM_STDIN,
            &format!("Stashing so many files ({}) at once", pathspecs.len()),
            " Please retry by stashing fewer files or install a more recent version of Git.",
        )?;
    }

    params.push("--".into());
    params.extend(pathspecs);
    Ok(GitCommand::new(args.repo_path, params))
}
