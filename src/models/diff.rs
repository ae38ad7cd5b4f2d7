//! models::diff
//!
//! Hunks of a unified diff.

use serde::Serialize;

/// `start,count` side of a hunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HunkRange {
    /// 1-based first line
    pub start: u32,
    pub count: u32,
}

impl HunkRange {
    /// Last line covered, or `start - 1` for an empty side.
    pub fn end(&self) -> u32 {
        (self.start + self.count).saturating_sub(1)
    }

    pub fn contains(&self, line: u32) -> bool {
        self.count > 0 && line >= self.start && line <= self.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HunkLineKind {
    Added,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HunkLine {
    pub kind: HunkLineKind,
    pub text: String,
}

/// One `@@ -a,b +c,d @@` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    pub previous: HunkRange,
    pub current: HunkRange,
    /// Text after the second `@@`
    pub header: String,
    pub lines: Vec<HunkLine>,
}

impl DiffHunk {
    /// Raw hunk body as git printed it.
    pub fn content(&self) -> String {
        self.lines
            .iter()
            .map(|l| {
                let marker = match l.kind {
                    HunkLineKind::Added => '+',
                    HunkLineKind::Removed => '-',
                    HunkLineKind::Unchanged => ' ',
                };
                format!("{}{}", marker, l.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text of 1-based current `line` and the removed text it replaced.
    ///
    /// Added lines pair with removed lines in order, so the k-th addition
    /// replaced the k-th removal. A hunk that only removes reports its first
    /// removed line.
    pub fn line_change(&self, line: u32) -> DiffHunkLine {
        let removed: Vec<&HunkLine> = self
            .lines
            .iter()
            .filter(|l| l.kind == HunkLineKind::Removed)
            .collect();

        if self.current.count == 0 {
            return DiffHunkLine {
                hunk: self.clone(),
                current: None,
                previous: removed.first().map(|l| l.text.clone()),
            };
        }

        let mut number = self.current.start;
        let mut added = 0;
        for hunk_line in &self.lines {
            if hunk_line.kind == HunkLineKind::Removed {
                continue;
            }
            if number == line {
                let previous = match hunk_line.kind {
                    HunkLineKind::Added => removed.get(added).map(|l| l.text.clone()),
                    _ => Some(hunk_line.text.clone()),
                };
                return DiffHunkLine {
                    hunk: self.clone(),
                    current: Some(hunk_line.text.clone()),
                    previous,
                };
            }
            if hunk_line.kind == HunkLineKind::Added {
                added += 1;
            }
            number += 1;
        }

        DiffHunkLine {
            hunk: self.clone(),
            current: None,
            previous: None,
        }
    }
}

/// A changed line with its hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunkLine {
    pub hunk: DiffHunk,
    pub current: Option<String>,
    /// Text the line replaced; `None` for a pure addition
    pub previous: Option<String>,
}

/// Diff of one file between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitDiff {
    pub base_sha: String,
    pub compare_sha: Option<String>,
    pub hunks: Vec<DiffHunk>,
}

impl GitDiff {
    /// Hunk whose current side covers 1-based `line`.
    pub fn hunk_for_line(&self, line: u32) -> Option<&DiffHunk> {
        self.hunks.iter().find(|h| {
            h.current.contains(line) || (h.current.count == 0 && h.current.start == line)
        })
    }
}
