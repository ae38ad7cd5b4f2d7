//! parsers::log
//!
//! `git log` record streams.
//!
//! Every record starts with `</f>` and carries `<x> value` header lines, an
//! optional `<s>`..`</s>` message block and, after `<f>`, whatever file
//! listing the command asked for: `--name-status`, `--numstat`,
//! `--summary` or `--shortstat`. The same record grammar serves stash
//! listings, which add a `<l>` selector line.
//!
//! With `-m`, git repeats a merge commit once per parent; repeated records
//! fold into the first one.

use std::collections::BTreeMap;

use super::diff::{parse_name_status_line, parse_shortstat};
use super::format::{self, parse_unix};
use crate::models::{Commit, CommitFile, DiffShortStat, FileStatus, GitLog, LineStats, LogAuthor};

/// One raw record.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LogRecord {
    pub sha: String,
    pub author: String,
    pub email: String,
    pub author_date: String,
    pub committer_date: String,
    pub parents: Vec<String>,
    pub selector: Option<String>,
    pub message: Option<String>,
    pub files: Vec<CommitFile>,
    pub stats: Option<DiffShortStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Message,
    Files,
}

fn field<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.strip_prefix(marker.trim_end()).map(str::trim)
}

/// Split a record stream into records. Never fails; junk lines are skipped.
pub(crate) fn parse_records(data: &str) -> Vec<LogRecord> {
    let mut records: Vec<LogRecord> = Vec::new();
    let mut current: Option<LogRecord> = None;
    let mut section = Section::Header;
    let mut message: Vec<&str> = Vec::new();

    for raw in data.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if section == Section::Message {
            if line == format::MESSAGE_END {
                if let Some(record) = current.as_mut() {
                    let text = message.join("\n").trim().to_string();
                    record.message = Some(text);
                }
                message.clear();
                section = Section::Header;
            } else {
                message.push(line);
            }
            continue;
        }

        if line == format::RECORD_START {
            if let Some(record) = current.take() {
                push_record(&mut records, record);
            }
            current = Some(LogRecord::default());
            section = Section::Header;
            continue;
        }

        // refs-format output has no record markers
        if current.is_none() {
            if let Some(sha) = field(line, format::SHA) {
                records.push(LogRecord {
                    sha: sha.to_string(),
                    ..Default::default()
                });
            }
            continue;
        }

        let Some(record) = current.as_mut() else {
            continue;
        };

        if section == Section::Files {
            parse_file_line(record, line);
            continue;
        }

        if line == format::FILES_START {
            section = Section::Files;
        } else if line == format::MESSAGE_START {
            section = Section::Message;
        } else if let Some(v) = field(line, format::SHA) {
            record.sha = v.to_string();
        } else if let Some(v) = field(line, format::AUTHOR) {
            record.author = v.to_string();
        } else if let Some(v) = field(line, format::EMAIL) {
            record.email = v.to_string();
        } else if let Some(v) = field(line, format::AUTHOR_DATE) {
            record.author_date = v.to_string();
        } else if let Some(v) = field(line, format::COMMITTER_DATE) {
            record.committer_date = v.to_string();
        } else if let Some(v) = field(line, format::PARENTS) {
            record.parents = v.split_whitespace().map(str::to_string).collect();
        } else if let Some(v) = field(line, format::SELECTOR) {
            record.selector = Some(v.to_string());
        }
    }

    if let Some(record) = current.take() {
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<LogRecord>, record: LogRecord) {
    if record.sha.is_empty() {
        return;
    }
    match records.iter_mut().find(|r| r.sha == record.sha) {
        Some(existing) => {
            for file in record.files {
                if !existing.files.iter().any(|f| f.path == file.path) {
                    existing.files.push(file);
                }
            }
            if existing.stats.is_none() {
                existing.stats = record.stats;
            }
        }
        None => records.push(record),
    }
}

fn parse_file_line(record: &mut LogRecord, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    if line.starts_with(' ') {
        let trimmed = line.trim();
        if let Some(stats) = parse_shortstat(trimmed) {
            record.stats = Some(stats);
        } else {
            apply_summary_line(record, trimmed);
        }
        return;
    }

    if let Some(file) = parse_numstat_line(line) {
        record.files.push(file);
        return;
    }

    if let Some(file) = parse_name_status_line(line) {
        record.files.push(file);
    }
}

/// `added<TAB>deleted<TAB>path`; binary files report `-`.
pub fn parse_numstat_line(line: &str) -> Option<CommitFile> {
    let mut parts = line.splitn(3, '\t');
    let added = parts.next()?;
    let deleted = parts.next()?;
    let path = parts.next()?;

    let count = |s: &str| -> Option<u32> {
        if s == "-" {
            Some(0)
        } else {
            s.parse().ok()
        }
    };
    let additions = count(added)?;
    let deletions = count(deleted)?;

    let (original_path, path) = match expand_rename(path) {
        Some((from, to)) => (Some(from), to),
        None => (None, path.to_string()),
    };

    Some(CommitFile {
        status: if original_path.is_some() {
            FileStatus::Renamed
        } else {
            FileStatus::Modified
        },
        path,
        original_path,
        stats: Some(LineStats {
            additions,
            deletions,
        }),
    })
}

/// Expand `a => b` and `dir/{a => b}/c` into `(from, to)`.
pub fn expand_rename(path: &str) -> Option<(String, String)> {
    if let (Some(open), Some(close)) = (path.find('{'), path.find('}')) {
        if open < close {
            let inner = &path[open + 1..close];
            let (from, to) = inner.split_once(" => ")?;
            let prefix = &path[..open];
            let suffix = &path[close + 1..];
            let join = |middle: &str| {
                let joined = format!("{}{}{}", prefix, middle, suffix);
                joined.replace("//", "/").trim_start_matches('/').to_string()
            };
            return Some((join(from), join(to)));
        }
    }
    path.split_once(" => ")
        .map(|(from, to)| (from.to_string(), to.to_string()))
}

fn apply_summary_line(record: &mut LogRecord, line: &str) {
    let (status, rest) = if let Some(rest) = line.strip_prefix("create mode ") {
        (FileStatus::Added, rest.split_once(' ').map(|(_, p)| p))
    } else if let Some(rest) = line.strip_prefix("delete mode ") {
        (FileStatus::Deleted, rest.split_once(' ').map(|(_, p)| p))
    } else if let Some(rest) = line.strip_prefix("rename ") {
        (FileStatus::Renamed, Some(strip_similarity(rest)))
    } else if let Some(rest) = line.strip_prefix("copy ") {
        (FileStatus::Copied, Some(strip_similarity(rest)))
    } else {
        return;
    };

    let Some(rest) = rest else {
        return;
    };

    let (original, path) = match status {
        FileStatus::Renamed | FileStatus::Copied => match expand_rename(rest) {
            Some((from, to)) => (Some(from), to),
            None => return,
        },
        _ => (None, rest.to_string()),
    };

    match record.files.iter_mut().find(|f| f.path == path) {
        Some(file) => {
            file.status = status;
            if original.is_some() {
                file.original_path = original;
            }
        }
        None => record.files.push(CommitFile {
            path,
            original_path: original,
            status,
            stats: None,
        }),
    }
}

fn strip_similarity(text: &str) -> &str {
    match text.rfind(" (") {
        Some(idx) if text.ends_with("%)") => &text[..idx],
        _ => text,
    }
}

/// Parameters the log parser needs beyond the raw text.
#[derive(Debug, Clone, Default)]
pub struct LogContext<'a> {
    pub repo_path: &'a str,
    /// Page size the caller asked for; the builder requests one extra record
    pub limit: Option<usize>,
}

/// Parse `git log` output. Empty input yields `None`.
pub fn parse_log(data: &str, context: &LogContext<'_>) -> Option<GitLog> {
    if data.trim().is_empty() {
        return None;
    }

    let mut records = parse_records(data);
    if records.is_empty() {
        return None;
    }

    let has_more = match context.limit {
        Some(limit) if limit > 0 && records.len() > limit => {
            records.truncate(limit);
            true
        }
        _ => false,
    };

    let mut authors: BTreeMap<String, LogAuthor> = BTreeMap::new();
    let commits: Vec<Commit> = records
        .into_iter()
        .map(|record| {
            if !record.author.is_empty() {
                authors
                    .entry(record.author.clone())
                    .or_insert_with(|| LogAuthor {
                        name: record.author.clone(),
                        line_count: 0,
                    })
                    .line_count += 1;
            }
            into_commit(record, context.repo_path)
        })
        .collect();

    Some(GitLog {
        repo_path: context.repo_path.to_string(),
        count: commits.len(),
        commits,
        authors,
        limit: context.limit,
        has_more,
        query: None,
    })
}

pub(crate) fn into_commit(record: LogRecord, repo_path: &str) -> Commit {
    let summary = record
        .message
        .as_deref()
        .and_then(|m| m.lines().next())
        .unwrap_or_default()
        .to_string();

    Commit {
        repo_path: repo_path.to_string(),
        sha: record.sha,
        author: record.author,
        email: record.email,
        author_date: parse_unix(&record.author_date),
        committer_date: parse_unix(&record.committer_date),
        parents: record.parents,
        summary,
        message: record.message,
        files: record.files,
        stats: record.stats,
    }
}

/// Shas from refs-format output, in order.
pub fn parse_log_refs(data: &str) -> Vec<String> {
    parse_records(data).into_iter().map(|r| r.sha).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_COMMITS: &str = "</f>
<r> 1111111111111111111111111111111111111111
<a> Ann Author
<e> ann@example.com
<d> 1700000000
<c> 1700000100
<p> 2222222222222222222222222222222222222222
<s>
Fix the thing

Longer body.
</s>
<f>

M\tsrc/lib.rs
R087\told.rs\tnew.rs
</f>
<r> 2222222222222222222222222222222222222222
<a> Bob
<e> bob@example.com
<d> 1600000000
<c> 1600000000
<p>
<s>
Initial commit
</s>
<f>

A\tsrc/lib.rs
";

    #[test]
    fn parses_default_format() {
        let log = parse_log(
            TWO_COMMITS,
            &LogContext {
                repo_path: "/repo",
                limit: None,
            },
        )
        .unwrap();

        assert_eq!(log.count, 2);
        let first = &log.commits[0];
        assert_eq!(first.author, "Ann Author");
        assert_eq!(first.summary, "Fix the thing");
        assert_eq!(first.message.as_deref(), Some("Fix the thing\n\nLonger body."));
        assert_eq!(first.parents.len(), 1);
        assert_eq!(first.files.len(), 2);
        assert_eq!(first.files[1].status, FileStatus::Renamed);
        assert_eq!(first.files[1].original_path.as_deref(), Some("old.rs"));

        let root = &log.commits[1];
        assert!(root.parents.is_empty());
        assert_eq!(root.files[0].status, FileStatus::Added);
        assert_eq!(log.authors.len(), 2);
    }

    #[test]
    fn limit_plus_one_sets_has_more() {
        let log = parse_log(
            TWO_COMMITS,
            &LogContext {
                repo_path: "/repo",
                limit: Some(1),
            },
        )
        .unwrap();
        assert_eq!(log.count, 1);
        assert!(log.has_more);
    }

    #[test]
    fn empty_input() {
        assert!(parse_log("", &LogContext::default()).is_none());
        assert!(parse_log("\n  \n", &LogContext::default()).is_none());
    }

    #[test]
    fn merge_commit_repeats_fold() {
        let data = "</f>
<r> aaaaaaa
<p> b c
<f>
3\t1\tone.rs
</f>
<r> aaaaaaa
<p> b c
<f>
2\t0\tone.rs
5\t5\ttwo.rs
";
        let records = parse_records(data);
        assert_eq!(records.len(), 1);
        let files: Vec<&str> = records[0].files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(files, ["one.rs", "two.rs"]);
        assert_eq!(
            records[0].files[0].stats,
            Some(LineStats {
                additions: 3,
                deletions: 1
            })
        );
    }

    #[test]
    fn numstat_with_summary() {
        let data = "</f>
<r> aaaaaaa
<f>

10\t0\tsrc/{a.rs => b.rs}
0\t0\tnew.txt
 rename src/{a.rs => b.rs} (92%)
 create mode 100644 new.txt
";
        let records = parse_records(data);
        let files = &records[0].files;
        assert_eq!(files[0].path, "src/b.rs");
        assert_eq!(files[0].original_path.as_deref(), Some("src/a.rs"));
        assert_eq!(files[0].status, FileStatus::Renamed);
        assert_eq!(files[1].status, FileStatus::Added);
    }

    #[test]
    fn shortstat_in_files_section() {
        let data = "</f>
<r> aaaaaaa
<a> Ann
<f>

 3 files changed, 10 insertions(+), 2 deletions(-)
";
        let records = parse_records(data);
        assert_eq!(
            records[0].stats,
            Some(DiffShortStat {
                files: 3,
                additions: 10,
                deletions: 2
            })
        );
    }

    #[test]
    fn refs_format() {
        let shas = parse_log_refs("<r> aaa\n<r> bbb\n");
        assert_eq!(shas, ["aaa", "bbb"]);
    }

    #[test]
    fn rename_expansion() {
        assert_eq!(
            expand_rename("a/{b => c}/d.rs"),
            Some(("a/b/d.rs".to_string(), "a/c/d.rs".to_string()))
        );
        assert_eq!(
            expand_rename("{ => sub}/x.rs"),
            Some(("x.rs".to_string(), "sub/x.rs".to_string()))
        );
        assert_eq!(
            expand_rename("old.rs => new.rs"),
            Some(("old.rs".to_string(), "new.rs".to_string()))
        );
        assert_eq!(expand_rename("plain.rs"), None);
    }
}
