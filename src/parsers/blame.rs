//! parsers::blame
//!
//! `git blame --incremental` output.
//!
//! Each group starts with `<sha> <original line> <final line> <line count>`.
//! The first group for a commit is followed by its headers (`author`,
//! `author-mail`, `summary`, ...); later groups for the same commit carry
//! only `previous`/`boundary` and `filename`. `filename` closes a group.

use crate::core::types::rev;
use crate::models::blame::authors_of;
use crate::models::{BlameCommit, BlameLine, GitBlame};

use super::format::parse_unix;

#[derive(Debug, Default)]
struct Group {
    sha: String,
    original_line: u32,
    line: u32,
    count: u32,
    previous_sha: Option<String>,
    previous_path: Option<String>,
}

/// Parse incremental blame output. Empty input yields `None`.
///
/// `current_user` renames the author of working-tree lines.
pub fn parse_blame(data: &str, repo_path: &str, current_user: Option<&str>) -> Option<GitBlame> {
    if data.trim().is_empty() {
        return None;
    }

    let mut commits: Vec<BlameCommit> = Vec::new();
    let mut lines: Vec<BlameLine> = Vec::new();
    let mut group: Option<Group> = None;

    for raw in data.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, v),
            None => (line, ""),
        };

        if group.is_none() || (rev::is_sha(key) && starts_group(value)) {
            if let Some(header) = parse_group_header(key, value) {
                ensure_commit(&mut commits, &header.sha);
                group = Some(header);
            }
            continue;
        }

        let Some(g) = group.as_mut() else {
            continue;
        };
        let Some(commit) = commits.iter_mut().find(|c| c.sha == g.sha) else {
            continue;
        };

        match key {
            "author" => {
                commit.author = if rev::is_uncommitted(&g.sha) {
                    current_user.unwrap_or("You").to_string()
                } else {
                    value.to_string()
                };
            }
            "author-mail" => {
                commit.email = value
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string();
            }
            "author-time" => commit.author_date = parse_unix(value),
            "committer" => commit.committer = value.to_string(),
            "committer-time" => commit.committer_date = parse_unix(value),
            "summary" => commit.summary = value.to_string(),
            "previous" => {
                let (sha, path) = value.split_once(' ').unwrap_or((value, ""));
                g.previous_sha = Some(sha.to_string());
                g.previous_path = Some(path.to_string()).filter(|p| !p.is_empty());
                commit.previous_sha = g.previous_sha.clone();
                commit.previous_path = g.previous_path.clone();
            }
            "boundary" => commit.boundary = true,
            "filename" => {
                commit.path = value.to_string();
                if let Some(g) = group.take() {
                    for i in 0..g.count {
                        let blamed = BlameLine {
                            sha: g.sha.clone(),
                            previous_sha: g.previous_sha.clone(),
                            original_line: g.original_line + i,
                            line: g.line + i,
                        };
                        commit.lines.push(blamed.clone());
                        lines.push(blamed);
                    }
                }
            }
            _ => {}
        }
    }

    if commits.is_empty() {
        return None;
    }

    commits.retain(|c| !c.lines.is_empty());
    for commit in &mut commits {
        commit.lines.sort_by_key(|l| l.line);
    }
    lines.sort_by_key(|l| l.line);

    Some(GitBlame {
        repo_path: repo_path.to_string(),
        authors: authors_of(&commits),
        commits,
        lines,
    })
}

fn starts_group(value: &str) -> bool {
    let parts: Vec<&str> = value.split(' ').collect();
    parts.len() == 3 && parts.iter().all(|p| p.parse::<u32>().is_ok())
}

fn parse_group_header(sha: &str, value: &str) -> Option<Group> {
    if !rev::is_sha(sha) {
        return None;
    }
    let mut nums = value.split(' ').map(|p| p.parse::<u32>().ok());
    let original_line = nums.next().flatten()?;
    let line = nums.next().flatten()?;
    let count = nums.next().flatten()?;
    Some(Group {
        sha: sha.to_string(),
        original_line,
        line,
        count,
        ..Default::default()
    })
}

fn ensure_commit(commits: &mut Vec<BlameCommit>, sha: &str) {
    if commits.iter().any(|c| c.sha == sha) {
        return;
    }
    commits.push(BlameCommit {
        sha: sha.to_string(),
        author: String::new(),
        email: String::new(),
        author_date: None,
        committer: String::new(),
        committer_date: None,
        summary: String::new(),
        path: String::new(),
        previous_sha: None,
        previous_path: None,
        boundary: false,
        lines: Vec::new(),
    });
}
