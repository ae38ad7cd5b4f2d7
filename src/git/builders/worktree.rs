//! Status, index and tree listings, ignore rules and configuration.

use crate::core::paths::split_path;
use crate::core::types::rev;
use crate::core::version::{requirements, GitVersion};
use crate::git::command::{ErrorHandling, GitCommand};

fn porcelain(version: GitVersion) -> &'static str {
    if version.at_least_version(requirements::STATUS_PORCELAIN_V2) {
        "--porcelain=v2"
    } else {
        "--porcelain"
    }
}

fn find_renames(version: GitVersion, similarity: Option<u8>) -> Option<String> {
    if !version.at_least_version(requirements::STATUS_FIND_RENAMES) {
        return None;
    }
    Some(match similarity {
        Some(n) => format!("--find-renames={}%", n),
        None => "--find-renames".to_string(),
    })
}

fn status_command(cwd: &str, params: Vec<String>) -> GitCommand {
    GitCommand::new(cwd, params)
        .config("color.status", "false")
        .env("GIT_OPTIONAL_LOCKS", "0")
}

/// Repository status, porcelain v2 when git supports it.
pub fn status(repo_path: &str, version: GitVersion, similarity: Option<u8>) -> GitCommand {
    let mut params = vec![
        "status".to_string(),
        porcelain(version).into(),
        "--branch".into(),
        "-u".into(),
    ];
    params.extend(find_renames(version, similarity));
    params.push("--".into());
    status_command(repo_path, params)
}

/// Status of a single path.
pub fn status_file(
    repo_path: Option<&str>,
    file: &str,
    version: GitVersion,
    similarity: Option<u8>,
) -> GitCommand {
    let (file, root) = split_path(file, repo_path);
    let mut params = vec!["status".to_string(), porcelain(version).into()];
    params.extend(find_renames(version, similarity));
    params.push("--".into());
    params.push(file);
    status_command(&root, params)
}

/// `ls-files`, against a tree with `reference`, or untracked files with `untracked`.
pub fn ls_files(repo_path: &str, file: &str, reference: Option<&str>, untracked: bool) -> GitCommand {
    let mut params = vec!["ls-files".to_string()];
    match reference {
        Some(r) if !rev::is_uncommitted(r) => params.push(format!("--with-tree={}", r)),
        None if untracked => params.push("-o".into()),
        _ => {}
    }
    params.extend(["--".into(), file.to_string()]);
    GitCommand::new(repo_path, params).errors(ErrorHandling::Ignore)
}

/// One entry with `file`, else the whole tree recursively.
pub fn ls_tree(repo_path: &str, reference: &str, file: Option<&str>) -> GitCommand {
    let params: Vec<String> = match file {
        Some(file) => vec![
            "ls-tree".into(),
            "-l".into(),
            reference.to_string(),
            "--".into(),
            file.to_string(),
        ],
        None => vec![
            "ls-tree".into(),
            "-lrt".into(),
            reference.to_string(),
            "--".into(),
        ],
    };
    GitCommand::new(repo_path, params).errors(ErrorHandling::Ignore)
}

/// Paths from `files` that are ignored, NUL separated in and out.
pub fn check_ignore(repo_path: &str, files: &[String]) -> GitCommand {
    GitCommand::new(repo_path, ["check-ignore", "-z", "--stdin"])
        .stdin(files.join("\0").into_bytes())
        .errors(ErrorHandling::Ignore)
}

/// Canonical `Name <email>` for an author.
pub fn check_mailmap(repo_path: &str, author: &str) -> GitCommand {
    GitCommand::new(repo_path, ["check-mailmap", author]).errors(ErrorHandling::Ignore)
}

/// `config --get <key>`. An empty `repo_path` reads global configuration.
pub fn config_get(repo_path: &str, key: &str) -> GitCommand {
    GitCommand::new(repo_path, ["config", "--get", key]).errors(ErrorHandling::Ignore)
}

pub fn config_get_regex(repo_path: &str, pattern: &str) -> GitCommand {
    GitCommand::new(repo_path, ["config", "--get-regex", pattern]).errors(ErrorHandling::Ignore)
}

/// `git --version`.
pub fn version(cwd: &str) -> GitCommand {
    GitCommand::new(cwd, ["--version"]).errors(ErrorHandling::Throw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_gates_porcelain_and_renames() {
        let old = status("/repo", GitVersion::new(2, 10, 0), Some(50));
        assert_eq!(old.args, ["status", "--porcelain", "--branch", "-u", "--"]);

        let mid = status("/repo", GitVersion::new(2, 11, 0), None);
        assert!(mid.has_arg("--porcelain=v2"));
        assert!(!mid.args.iter().any(|a| a.starts_with("--find-renames")));

        let new = status("/repo", GitVersion::new(2, 18, 0), Some(50));
        assert!(new.has_arg("--find-renames=50%"));
        assert_eq!(
            new.env,
            [("GIT_OPTIONAL_LOCKS".to_string(), "0".to_string())]
        );
    }

    #[test]
    fn status_of_file_runs_in_its_root() {
        let cmd = status_file(Some("/repo"), "/repo/src/a.rs", GitVersion::new(2, 40, 0), None);
        assert_eq!(cmd.cwd.to_str(), Some("/repo"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("src/a.rs"));
    }

    #[test]
    fn ls_files_modes() {
        assert!(ls_files("/r", "a", Some("HEAD"), false).has_arg("--with-tree=HEAD"));
        assert!(!ls_files("/r", "a", Some(rev::UNCOMMITTED), false)
            .args
            .iter()
            .any(|a| a.starts_with("--with-tree")));
        assert!(ls_files("/r", "a", None, true).has_arg("-o"));
    }

    #[test]
    fn check_ignore_uses_nul_stdin() {
        let files = vec!["a".to_string(), "b".to_string()];
        let cmd = check_ignore("/r", &files);
        assert_eq!(cmd.stdin.as_deref(), Some("a\0b".as_bytes()));
    }
}
