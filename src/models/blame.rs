//! models::blame
//!
//! Per-line attribution.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Attribution of one line of the file being blamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameLine {
    pub sha: String,
    pub previous_sha: Option<String>,
    /// 1-based line in the commit that introduced it
    pub original_line: u32,
    /// 1-based line in the blamed revision
    pub line: u32,
}

/// A commit that owns one or more blamed lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlameCommit {
    pub sha: String,
    pub author: String,
    pub email: String,
    pub author_date: Option<DateTime<Utc>>,
    pub committer: String,
    pub committer_date: Option<DateTime<Utc>>,
    pub summary: String,
    /// Path of the file in this commit
    pub path: String,
    pub previous_sha: Option<String>,
    pub previous_path: Option<String>,
    /// Root or boundary commit
    pub boundary: bool,
    pub lines: Vec<BlameLine>,
}

impl BlameCommit {
    pub fn is_uncommitted(&self) -> bool {
        crate::core::types::rev::is_uncommitted(&self.sha)
    }
}

/// Line totals per author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlameAuthor {
    pub name: String,
    pub line_count: u32,
}

/// Blame of a whole file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitBlame {
    pub repo_path: String,
    /// Sorted by descending line count
    pub authors: Vec<BlameAuthor>,
    /// In order of first appearance
    pub commits: Vec<BlameCommit>,
    /// Sorted by line
    pub lines: Vec<BlameLine>,
}

impl GitBlame {
    pub fn commit(&self, sha: &str) -> Option<&BlameCommit> {
        self.commits.iter().find(|c| c.sha == sha)
    }

    /// Attribution of 1-based `line`.
    pub fn line(&self, line: u32) -> Option<&BlameLine> {
        self.lines
            .binary_search_by_key(&line, |l| l.line)
            .ok()
            .map(|idx| &self.lines[idx])
    }

    /// Restrict to 1-based inclusive `start..=end`.
    pub fn range(&self, start: u32, end: u32) -> GitBlame {
        let lines: Vec<BlameLine> = self
            .lines
            .iter()
            .filter(|l| l.line >= start && l.line <= end)
            .cloned()
            .collect();

        let mut commits: Vec<BlameCommit> = Vec::new();
        for line in &lines {
            if commits.iter().any(|c| c.sha == line.sha) {
                continue;
            }
            if let Some(commit) = self.commit(&line.sha) {
                let mut commit = commit.clone();
                commit.lines.retain(|l| l.line >= start && l.line <= end);
                commits.push(commit);
            }
        }

        GitBlame {
            repo_path: self.repo_path.clone(),
            authors: authors_of(&commits),
            commits,
            lines,
        }
    }
}

/// Author totals sorted by descending line count, then name.
pub fn authors_of(commits: &[BlameCommit]) -> Vec<BlameAuthor> {
    let mut authors: Vec<BlameAuthor> = Vec::new();
    for commit in commits {
        let count = commit.lines.len() as u32;
        match authors.iter_mut().find(|a| a.name == commit.author) {
            Some(author) => author.line_count += count,
            None => authors.push(BlameAuthor {
                name: commit.author.clone(),
                line_count: count,
            }),
        }
    }
    authors.sort_by(|a, b| b.line_count.cmp(&a.line_count).then_with(|| a.name.cmp(&b.name)));
    authors
}

/// Blame of a single line, with its commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitBlameLine {
    pub author: BlameAuthor,
    pub commit: BlameCommit,
    pub line: BlameLine,
}
