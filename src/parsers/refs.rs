//! parsers::refs
//!
//! Branches, tags, remotes, reflog entries, contributor summaries and the
//! small one-line outputs of `rev-list`/`rev-parse`.

use std::sync::LazyLock;

use regex::Regex;

use super::format::parse_iso8601;
use crate::models::{
    AheadBehind, Branch, Contributor, Remote, RemoteUrl, RemoteUrlKind, ReflogRecord, Tag,
    Upstream,
};

static BRANCH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^<h>(.+)<n>(.+)<u>(.*)<t>(?:\[(?:ahead ([0-9]+))?[,\s]*(?:behind ([0-9]+))?]|\[(gone)])?<r>(.*)<d>(.*)$",
    )
    .expect("branch pattern compiles")
});

static TAG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<n>(.+)<r>(.*)<c>(.*)<d>(.*)<s>(.*)$").expect("tag pattern compiles")
});

static REFLOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<r>\s(.+)<d>\s(.+)@\{(.+)\}<s>(\w*)(.*?)(?::(.*))?$")
        .expect("reflog pattern compiles")
});

static REMOTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+(\S+)\s+\((fetch|push)\)$").expect("remote pattern compiles")
});

static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\w+://)(?:[^@/]+@)?([^/:]+)(?::\d+)?/|(?:[^@/]+@)?([^/:]+):)(.+?)(?:\.git)?/?$")
        .expect("remote url pattern compiles")
});

static SHORTLOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s+(.+?)\s+<(.*)>\s*$").expect("shortlog pattern compiles")
});

/// `git for-each-ref --format=<BRANCH>` output.
///
/// Symbolic remote heads (`origin/HEAD`) are skipped.
pub fn parse_branches(data: &str, repo_path: &str) -> Vec<Branch> {
    data.lines()
        .filter_map(|line| {
            let caps = BRANCH_LINE.captures(line.trim_end_matches('\r'))?;
            let refname = caps.get(2)?.as_str();
            let (name, remote) = if let Some(name) = refname.strip_prefix("refs/heads/") {
                (name, false)
            } else if let Some(name) = refname.strip_prefix("refs/remotes/") {
                if name.ends_with("/HEAD") {
                    return None;
                }
                (name, true)
            } else {
                return None;
            };

            let upstream = caps
                .get(3)
                .map(|m| m.as_str())
                .filter(|u| !u.is_empty())
                .map(|u| Upstream {
                    name: u.to_string(),
                    missing: caps.get(6).is_some(),
                });

            let count = |i: usize| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };

            Some(Branch {
                repo_path: repo_path.to_string(),
                name: name.to_string(),
                remote,
                current: caps.get(1).is_some_and(|m| m.as_str() == "*"),
                sha: caps
                    .get(7)
                    .map(|m| m.as_str().to_string())
                    .filter(|s| !s.is_empty()),
                upstream,
                ahead: count(4),
                behind: count(5),
                date: caps.get(8).and_then(|m| parse_iso8601(m.as_str())),
                detached: false,
                rebasing: false,
            })
        })
        .collect()
}

/// `git tag -l --format=<TAG>` output.
pub fn parse_tags(data: &str, repo_path: &str) -> Vec<Tag> {
    data.lines()
        .filter_map(|line| {
            let caps = TAG_LINE.captures(line.trim_end_matches('\r'))?;
            let text = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
            Some(Tag {
                repo_path: repo_path.to_string(),
                name: text(1).to_string(),
                sha: text(2).to_string(),
                commit_sha: Some(text(3).to_string()).filter(|s| !s.is_empty()),
                date: parse_iso8601(text(4)),
                message: text(5).to_string(),
            })
        })
        .collect()
}

/// `git log --walk-reflogs --format=<REFLOG>` output.
///
/// Returns every parsed record; callers filter by command.
pub fn parse_reflog(data: &str) -> Vec<ReflogRecord> {
    data.lines()
        .filter_map(|line| {
            let caps = REFLOG_LINE.captures(line.trim_end_matches('\r'))?;
            let text = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
            Some(ReflogRecord {
                sha: text(1).to_string(),
                selector: text(2).to_string(),
                date: text(3).to_string(),
                command: text(4).to_string(),
                command_args: text(5).to_string(),
                details: text(6).trim().to_string(),
            })
        })
        .collect()
}

/// Split a remote URL into `(scheme, domain, path)`.
///
/// ```
/// use gitscope::parsers::refs::parse_remote_url;
///
/// assert_eq!(
///     parse_remote_url("git@github.com:owner/repo.git"),
///     Some((String::new(), "github.com".to_string(), "owner/repo".to_string()))
/// );
/// assert_eq!(
///     parse_remote_url("https://gitlab.com/group/sub/project"),
///     Some(("https://".to_string(), "gitlab.com".to_string(), "group/sub/project".to_string()))
/// );
/// ```
pub fn parse_remote_url(url: &str) -> Option<(String, String, String)> {
    let caps = REMOTE_URL.captures(url.trim())?;
    let scheme = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let domain = caps.get(2).or_else(|| caps.get(3))?.as_str();
    let path = caps.get(4)?.as_str();
    Some((scheme.to_string(), domain.to_lowercase(), path.to_string()))
}

/// `git remote -v` output, one [`Remote`] per name in first-seen order.
pub fn parse_remotes(data: &str, repo_path: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();

    for line in data.lines() {
        let Some(caps) = REMOTE_LINE.captures(line.trim_end_matches('\r')) else {
            continue;
        };
        let (Some(name), Some(url), Some(kind)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            continue;
        };
        let kind = if kind.as_str() == "push" {
            RemoteUrlKind::Push
        } else {
            RemoteUrlKind::Fetch
        };
        let url = url.as_str().to_string();

        match remotes.iter_mut().find(|r| r.name == name.as_str()) {
            Some(remote) => remote.urls.push(RemoteUrl { url, kind }),
            None => {
                let (scheme, domain, path) = parse_remote_url(&url).unwrap_or_default();
                remotes.push(Remote {
                    repo_path: repo_path.to_string(),
                    name: name.as_str().to_string(),
                    scheme,
                    domain,
                    path,
                    urls: vec![RemoteUrl { url, kind }],
                });
            }
        }
    }

    remotes
}

/// `git shortlog -sne` output.
pub fn parse_shortlog(data: &str, repo_path: &str) -> Vec<Contributor> {
    data.lines()
        .filter_map(|line| {
            let caps = SHORTLOG_LINE.captures(line)?;
            Some(Contributor {
                repo_path: repo_path.to_string(),
                commits: caps.get(1)?.as_str().parse().ok()?,
                name: caps.get(2)?.as_str().to_string(),
                email: caps.get(3)?.as_str().to_string(),
                additions: None,
                deletions: None,
                files: None,
                current: false,
            })
        })
        .collect()
}

/// `git rev-list --left-right --count a...b` output: `<left>\t<right>`.
///
/// Left is what `a` has that `b` lacks.
pub fn parse_left_right_count(data: &str) -> Option<AheadBehind> {
    let mut parts = data.trim().split(|c: char| c == '\t' || c == ' ');
    let left = parts.next()?.parse().ok()?;
    let right = parts.next()?.parse().ok()?;
    Some(AheadBehind {
        ahead: left,
        behind: right,
    })
}

/// Current branch and upstream from
/// `rev-parse --abbrev-ref --symbolic-full-name @ @{u}`.
pub fn parse_current_branch(data: &str) -> Option<(String, Option<String>)> {
    let mut lines = data.lines().map(str::trim).filter(|l| !l.is_empty());
    let branch = lines.next()?.to_string();
    let upstream = lines.next().filter(|u| *u != "@{u}").map(str::to_string);
    Some((branch, upstream))
}
