//! models::commit
//!
//! Commits, the files they touch, and log pages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status letter git reports for a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileStatus {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    TypeChanged,
    Unmerged,
    Untracked,
    Ignored,
    Unknown,
}

impl FileStatus {
    /// Map a `--name-status` / porcelain code.
    pub fn from_code(code: char) -> Self {
        match code {
            'A' => FileStatus::Added,
            'C' => FileStatus::Copied,
            'D' => FileStatus::Deleted,
            'M' => FileStatus::Modified,
            'R' => FileStatus::Renamed,
            'T' => FileStatus::TypeChanged,
            'U' => FileStatus::Unmerged,
            '?' => FileStatus::Untracked,
            '!' => FileStatus::Ignored,
            _ => FileStatus::Unknown,
        }
    }

    pub fn code(&self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Copied => 'C',
            FileStatus::Deleted => 'D',
            FileStatus::Modified => 'M',
            FileStatus::Renamed => 'R',
            FileStatus::TypeChanged => 'T',
            FileStatus::Unmerged => 'U',
            FileStatus::Untracked => '?',
            FileStatus::Ignored => '!',
            FileStatus::Unknown => 'X',
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Added/removed line counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineStats {
    pub additions: u32,
    pub deletions: u32,
}

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFile {
    pub path: String,
    /// Source path of a rename or copy
    pub original_path: Option<String>,
    pub status: FileStatus,
    pub stats: Option<LineStats>,
}

impl CommitFile {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            original_path: None,
            status,
            stats: None,
        }
    }
}

/// `--shortstat` summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffShortStat {
    pub files: u32,
    pub additions: u32,
    pub deletions: u32,
}

/// A commit as read from `git log`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub repo_path: String,
    pub sha: String,
    pub author: String,
    pub email: String,
    pub author_date: Option<DateTime<Utc>>,
    pub committer_date: Option<DateTime<Utc>>,
    pub parents: Vec<String>,
    /// First line of the message
    pub summary: String,
    pub message: Option<String>,
    pub files: Vec<CommitFile>,
    pub stats: Option<DiffShortStat>,
}

impl Commit {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// The file entry for `path`, if the commit touched it.
    pub fn file(&self, path: &str) -> Option<&CommitFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn short_sha(&self) -> &str {
        &self.sha[..self.sha.len().min(7)]
    }
}

/// Per-author aggregate within a log page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogAuthor {
    pub name: String,
    pub line_count: u32,
}

/// Parameters that produced a log page; replaying them with a wider window
/// fetches the next page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LogQuery {
    pub repo_path: String,
    /// File path for file histories
    pub file: Option<String>,
    pub reference: Option<String>,
    pub limit: Option<usize>,
    pub skip: usize,
    pub all: bool,
    pub merges: bool,
    pub follow: bool,
    pub since: Option<String>,
    pub authors: Vec<String>,
    pub ordering: Option<String>,
    pub reverse: bool,
    /// Line range for `-L`
    pub range: Option<(u32, u32)>,
    /// Follow first parents only
    pub first_parent: bool,
    /// Commit search this page answers
    pub search: Option<SearchPattern>,
}

/// A commit search as typed by a user, e.g. `author:ann message:"fix bug"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPattern {
    pub pattern: String,
    /// Every message term must match
    pub match_all: bool,
    pub match_case: bool,
    /// Values are extended regular expressions instead of fixed strings
    pub match_regex: bool,
}

impl SearchPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_all: false,
            match_case: false,
            match_regex: true,
        }
    }
}

/// One page of commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitLog {
    pub repo_path: String,
    /// Newest first, unless the query asked for reverse order
    pub commits: Vec<Commit>,
    pub authors: BTreeMap<String, LogAuthor>,
    pub count: usize,
    pub limit: Option<usize>,
    pub has_more: bool,
    /// Replayable query, present when more commits can be requested
    pub query: Option<LogQuery>,
}

impl GitLog {
    pub fn empty(repo_path: &str) -> Self {
        Self {
            repo_path: repo_path.to_string(),
            commits: Vec::new(),
            authors: BTreeMap::new(),
            count: 0,
            limit: None,
            has_more: false,
            query: None,
        }
    }

    pub fn get(&self, sha: &str) -> Option<&Commit> {
        self.commits.iter().find(|c| c.sha == sha)
    }

    pub fn contains(&self, sha: &str) -> bool {
        self.get(sha).is_some()
    }

    /// Oldest commit on the page.
    pub fn last(&self) -> Option<&Commit> {
        self.commits.last()
    }

    /// Append commits not already present and fold their author counts in.
    pub fn merge(&mut self, other: GitLog) {
        for (key, author) in other.authors {
            self.authors
                .entry(key)
                .and_modify(|a| a.line_count += author.line_count)
                .or_insert(author);
        }
        for commit in other.commits {
            if !self.contains(&commit.sha) {
                self.commits.push(commit);
            }
        }
        self.count = self.commits.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(sha: &str, author: &str) -> Commit {
        Commit {
            repo_path: "/r".to_string(),
            sha: sha.to_string(),
            author: author.to_string(),
            email: String::new(),
            author_date: None,
            committer_date: None,
            parents: Vec::new(),
            summary: String::new(),
            message: None,
            files: Vec::new(),
            stats: None,
        }
    }

    fn log(commits: Vec<Commit>) -> GitLog {
        let mut log = GitLog::empty("/r");
        for c in &commits {
            log.authors
                .entry(c.author.clone())
                .or_insert(LogAuthor {
                    name: c.author.clone(),
                    line_count: 0,
                })
                .line_count += 1;
        }
        log.count = commits.len();
        log.commits = commits;
        log
    }

    #[test]
    fn status_codes() {
        for code in ['A', 'C', 'D', 'M', 'R', 'T', 'U', '?', '!'] {
            assert_eq!(FileStatus::from_code(code).code(), code);
        }
        assert_eq!(FileStatus::from_code('Z'), FileStatus::Unknown);
    }

    #[test]
    fn merge_skips_duplicates_and_sums_authors() {
        let mut first = log(vec![commit("a", "ann"), commit("b", "bob")]);
        let second = log(vec![commit("b", "bob"), commit("c", "ann")]);

        first.merge(second);

        let shas: Vec<&str> = first.commits.iter().map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, ["a", "b", "c"]);
        assert_eq!(first.count, 3);
        assert_eq!(first.authors["ann"].line_count, 2);
        assert_eq!(first.authors["bob"].line_count, 2);
    }
}
