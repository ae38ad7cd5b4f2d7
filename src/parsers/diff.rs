//! parsers::diff
//!
//! Unified diff hunks, `--name-status` listings and `--shortstat` summaries.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    CommitFile, DiffHunk, DiffShortStat, FileStatus, GitDiff, HunkLine, HunkLineKind, HunkRange,
};

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -([0-9]+)(?:,([0-9]+))? \+([0-9]+)(?:,([0-9]+))? @@(.*)$")
        .expect("hunk header pattern compiles")
});

static SHORTSTAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?")
        .expect("shortstat pattern compiles")
});

/// One `--name-status` line: `M<TAB>path` or `R100<TAB>old<TAB>new`.
pub fn parse_name_status_line(line: &str) -> Option<CommitFile> {
    let mut parts = line.split('\t');
    let code = parts.next()?;
    let mut chars = code.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_uppercase() || !chars.all(|c| c.is_ascii_digit()) {
        return None;
    }

    let status = FileStatus::from_code(letter);
    let first = parts.next().filter(|p| !p.is_empty())?;
    let second = parts.next().filter(|p| !p.is_empty());

    Some(match second {
        Some(path) => CommitFile {
            path: path.to_string(),
            original_path: Some(first.to_string()),
            status,
            stats: None,
        },
        None => CommitFile::new(first, status),
    })
}

/// Parse a whole `--name-status` listing. Unparseable lines are skipped.
pub fn parse_name_status(data: &str) -> Vec<CommitFile> {
    data.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter_map(parse_name_status_line)
        .collect()
}

/// ` 3 files changed, 10 insertions(+), 2 deletions(-)`.
pub fn parse_shortstat(data: &str) -> Option<DiffShortStat> {
    let caps = SHORTSTAT.captures(data)?;
    let num = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    Some(DiffShortStat {
        files: num(1),
        additions: num(2),
        deletions: num(3),
    })
}

/// Parse the hunks of a single-file unified diff. Empty input yields `None`.
pub fn parse_diff(data: &str, base_sha: &str, compare_sha: Option<&str>) -> Option<GitDiff> {
    if data.trim().is_empty() {
        return None;
    }

    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;

    for raw in data.lines() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(caps) = HUNK_HEADER.captures(line) {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }
            let num = |i: usize, default: u32| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(default)
            };
            current = Some(DiffHunk {
                previous: HunkRange {
                    start: num(1, 0),
                    count: num(2, 1),
                },
                current: HunkRange {
                    start: num(3, 0),
                    count: num(4, 1),
                },
                header: caps
                    .get(5)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
                lines: Vec::new(),
            });
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            // diff --git / index / ---/+++ preamble
            continue;
        };

        let (kind, text) = match line.chars().next() {
            Some('+') => (HunkLineKind::Added, &line[1..]),
            Some('-') => (HunkLineKind::Removed, &line[1..]),
            Some(' ') => (HunkLineKind::Unchanged, &line[1..]),
            Some('\\') => continue,
            None => (HunkLineKind::Unchanged, ""),
            _ => continue,
        };
        hunk.lines.push(HunkLine {
            kind,
            text: text.to_string(),
        });
    }

    if let Some(hunk) = current.take() {
        hunks.push(hunk);
    }

    Some(GitDiff {
        base_sha: base_sha.to_string(),
        compare_sha: compare_sha.map(str::to_string),
        hunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_status_single_record() {
        let files = parse_name_status("M\tfile.txt\n");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, FileStatus::Modified);
        assert_eq!(files[0].path, "file.txt");
    }

    #[test]
    fn name_status_rename_and_copy() {
        let files = parse_name_status("R100\ta.txt\tb.txt\nC075\tx\ty\nD\tgone.rs\n");
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].status, FileStatus::Renamed);
        assert_eq!(files[0].original_path.as_deref(), Some("a.txt"));
        assert_eq!(files[0].path, "b.txt");
        assert_eq!(files[1].status, FileStatus::Copied);
        assert_eq!(files[2].status, FileStatus::Deleted);
    }

    #[test]
    fn name_status_empty_and_junk() {
        assert!(parse_name_status("").is_empty());
        assert!(parse_name_status("warning: something\n\n").is_empty());
    }

    #[test]
    fn shortstat_variants() {
        assert_eq!(
            parse_shortstat(" 1 file changed, 1 insertion(+)"),
            Some(DiffShortStat {
                files: 1,
                additions: 1,
                deletions: 0
            })
        );
        assert_eq!(
            parse_shortstat(" 2 files changed, 3 deletions(-)"),
            Some(DiffShortStat {
                files: 2,
                additions: 0,
                deletions: 3
            })
        );
        assert_eq!(parse_shortstat(""), None);
    }

    #[test]
    fn hunks_with_zero_context() {
        let data = "diff --git a/f b/f
index 1..2 100644
--- a/f
+++ b/f
@@ -1 +1 @@
-old
+new
@@ -10,0 +11,2 @@ fn main() {
+added one
+added two
\\ No newline at end of file
";
        let diff = parse_diff(data, "abc", None).unwrap();
        assert_eq!(diff.hunks.len(), 2);

        let first = &diff.hunks[0];
        assert_eq!(first.previous, HunkRange { start: 1, count: 1 });
        assert_eq!(first.lines.len(), 2);

        let second = &diff.hunks[1];
        assert_eq!(second.previous, HunkRange { start: 10, count: 0 });
        assert_eq!(second.current, HunkRange { start: 11, count: 2 });
        assert_eq!(second.header, "fn main() {");
        assert_eq!(second.lines.len(), 2);
        assert_eq!(diff.hunk_for_line(12).map(|h| h.current.start), Some(11));
    }

    #[test]
    fn empty_diff() {
        assert!(parse_diff("", "a", None).is_none());
    }
}
