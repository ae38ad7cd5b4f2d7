//! parsers::status
//!
//! `git status --porcelain` (v1 and v2, both with `--branch`) and
//! `git stash list`.

use std::sync::LazyLock;

use regex::Regex;

use super::format::parse_unix;
use super::log::parse_records;
use crate::models::{FileStatus, RepoStatus, Stash, StashEntry, StatusFile};

static V1_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^## (?:No commits yet on |Initial commit on )?(.+?)(?:\.\.\.(\S+))?(?: \[(?:ahead (\d+))?(?:, )?(?:behind (\d+))?(?:gone)?\])?$")
        .expect("status branch pattern compiles")
});

fn column(code: char) -> Option<FileStatus> {
    match code {
        ' ' | '.' => None,
        c => Some(FileStatus::from_code(c)),
    }
}

fn is_conflict(x: char, y: char) -> bool {
    matches!(
        (x, y),
        ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
    )
}

fn status_file(x: char, y: char, path: &str, original_path: Option<&str>) -> StatusFile {
    StatusFile {
        path: path.to_string(),
        original_path: original_path.map(str::to_string),
        index_status: column(x),
        working_tree_status: column(y),
        conflicted: is_conflict(x, y),
    }
}

/// Parse porcelain output; v2 is recognized by its `# branch.` headers.
pub fn parse_status(data: &str, repo_path: &str) -> Option<RepoStatus> {
    if data.trim().is_empty() {
        return None;
    }

    let v2 = data.lines().any(|l| l.starts_with("# branch.") || l.starts_with("1 "));
    Some(if v2 {
        parse_v2(data, repo_path)
    } else {
        parse_v1(data, repo_path)
    })
}

fn empty_status(repo_path: &str) -> RepoStatus {
    RepoStatus {
        repo_path: repo_path.to_string(),
        branch: None,
        sha: None,
        upstream: None,
        ahead: 0,
        behind: 0,
        files: Vec::new(),
    }
}

fn parse_v1(data: &str, repo_path: &str) -> RepoStatus {
    let mut status = empty_status(repo_path);

    for raw in data.lines() {
        let line = raw.trim_end_matches('\r');
        if line.starts_with("## ") {
            if let Some(caps) = V1_BRANCH.captures(line) {
                let branch = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if !branch.starts_with("HEAD (no branch)") {
                    status.branch = Some(branch.to_string());
                }
                status.upstream = caps.get(2).map(|m| m.as_str().to_string());
                status.ahead = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
                status.behind = caps.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            }
            continue;
        }

        let mut chars = line.chars();
        let (Some(x), Some(y), Some(' ')) = (chars.next(), chars.next(), chars.next()) else {
            continue;
        };
        let rest = chars.as_str();
        let file = match rest.split_once(" -> ") {
            Some((from, to)) => status_file(x, y, to, Some(from)),
            None => status_file(x, y, rest, None),
        };
        status.files.push(file);
    }

    status
}

fn parse_v2(data: &str, repo_path: &str) -> RepoStatus {
    let mut status = empty_status(repo_path);

    for raw in data.lines() {
        let line = raw.trim_end_matches('\r');

        if let Some(header) = line.strip_prefix("# ") {
            let (key, value) = header.split_once(' ').unwrap_or((header, ""));
            match key {
                "branch.oid" if value != "(initial)" => status.sha = Some(value.to_string()),
                "branch.head" if value != "(detached)" => status.branch = Some(value.to_string()),
                "branch.upstream" => status.upstream = Some(value.to_string()),
                "branch.ab" => {
                    for part in value.split_whitespace() {
                        if let Some(n) = part.strip_prefix('+') {
                            status.ahead = n.parse().unwrap_or(0);
                        } else if let Some(n) = part.strip_prefix('-') {
                            status.behind = n.parse().unwrap_or(0);
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        let Some((kind, rest)) = line.split_once(' ') else {
            continue;
        };
        let file = match kind {
            // 1 XY sub mH mI mW hH hI path
            "1" => ordinary(rest, 6, None),
            // 2 XY sub mH mI mW hH hI Xscore path<TAB>orig
            "2" => {
                let (fields, original) = rest.split_once('\t').unwrap_or((rest, ""));
                ordinary(fields, 7, Some(original).filter(|o| !o.is_empty()))
            }
            // u XY sub m1 m2 m3 mW h1 h2 h3 path
            "u" => ordinary(rest, 8, None).map(|mut f| {
                f.conflicted = true;
                f
            }),
            "?" => Some(status_file('?', '?', rest, None)),
            "!" => Some(status_file('!', '!', rest, None)),
            _ => None,
        };
        if let Some(file) = file {
            status.files.push(file);
        }
    }

    status
}

/// `XY` followed by `skip` space-separated fields, then the path.
fn ordinary(rest: &str, skip: usize, original: Option<&str>) -> Option<StatusFile> {
    let mut parts = rest.splitn(skip + 2, ' ');
    let xy = parts.next()?;
    let path = parts.nth(skip)?;
    let mut chars = xy.chars();
    let (x, y) = (chars.next()?, chars.next()?);
    Some(status_file(x, y, path, original))
}

/// `git stash list --format=<STASH>` output.
pub fn parse_stash(data: &str, repo_path: &str) -> Option<Stash> {
    if data.trim().is_empty() {
        return None;
    }

    let entries = parse_records(data)
        .into_iter()
        .filter(|r| !r.sha.is_empty())
        .map(|r| StashEntry {
            repo_path: repo_path.to_string(),
            stash_name: r.selector.unwrap_or_default(),
            sha: r.sha,
            date: parse_unix(&r.author_date),
            committer_date: parse_unix(&r.committer_date),
            message: r.message.unwrap_or_default(),
            files: r.files,
        })
        .collect();

    Some(Stash {
        repo_path: repo_path.to_string(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_v1() {
        let data = "## main...origin/main [ahead 1, behind 2]\n M src/lib.rs\nA  new.rs\nR  old.rs -> renamed.rs\nUU both.rs\n?? scratch.txt\n";
        let status = parse_status(data, "/repo").unwrap();
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert_eq!(status.upstream.as_deref(), Some("origin/main"));
        assert_eq!((status.ahead, status.behind), (1, 2));
        assert_eq!(status.files.len(), 5);

        let lib = status.file("src/lib.rs").unwrap();
        assert_eq!(lib.index_status, None);
        assert_eq!(lib.working_tree_status, Some(FileStatus::Modified));

        let renamed = status.file("renamed.rs").unwrap();
        assert_eq!(renamed.original_path.as_deref(), Some("old.rs"));
        assert!(renamed.staged());

        assert!(status.has_conflicts());
        assert_eq!(status.file("scratch.txt").unwrap().status(), FileStatus::Untracked);
    }

    #[test]
    fn porcelain_v1_without_upstream() {
        let status = parse_status("## feature\n", "/repo").unwrap();
        assert_eq!(status.branch.as_deref(), Some("feature"));
        assert_eq!(status.upstream, None);

        let fresh = parse_status("## No commits yet on main\n", "/repo").unwrap();
        assert_eq!(fresh.branch.as_deref(), Some("main"));
    }

    #[test]
    fn porcelain_v2() {
        let data = "\
# branch.oid 1111111111111111111111111111111111111111
# branch.head main
# branch.upstream origin/main
# branch.ab +3 -0
1 .M N... 100644 100644 100644 aaaa bbbb src/with space.rs
2 R. N... 100644 100644 100644 aaaa bbbb R100 new.rs\told.rs
u UU N... 100644 100644 100644 100644 aaaa bbbb cccc conflict.rs
? untracked.txt
";
        let status = parse_status(data, "/repo").unwrap();
        assert_eq!(status.sha.as_deref(), Some("1111111111111111111111111111111111111111"));
        assert_eq!(status.ahead, 3);
        assert_eq!(status.files.len(), 4);
        assert_eq!(status.files[0].path, "src/with space.rs");
        assert_eq!(status.files[1].original_path.as_deref(), Some("old.rs"));
        assert_eq!(status.files[1].index_status, Some(FileStatus::Renamed));
        assert!(status.files[2].conflicted);
        assert_eq!(status.files[3].status(), FileStatus::Untracked);
    }

    #[test]
    fn detached_v2() {
        let data = "# branch.oid abcd\n# branch.head (detached)\n";
        let status = parse_status(data, "/repo").unwrap();
        assert_eq!(status.branch, None);
        assert_eq!(status.sha.as_deref(), Some("abcd"));
    }

    #[test]
    fn stash_list() {
        let data = "</f>
<r> 1111111111111111111111111111111111111111
<d> 1700000000
<c> 1700000000
<l> stash@{0}
<s>
WIP on main: abc Fix
</s>
<f>

M\tsrc/lib.rs
A\tnew.rs
</f>
<r> 2222222222222222222222222222222222222222
<d> 1600000000
<c> 1600000000
<l> stash@{1}
<s>
On main: saved
</s>
<f>
";
        let stash = parse_stash(data, "/repo").unwrap();
        assert_eq!(stash.entries.len(), 2);
        assert_eq!(stash.entries[0].stash_name, "stash@{0}");
        assert_eq!(stash.entries[0].files.len(), 2);
        assert_eq!(stash.entries[1].message, "On main: saved");
        assert!(stash.find("2222222222222222222222222222222222222222").is_some());
        assert!(parse_stash("", "/repo").is_none());
    }
}
