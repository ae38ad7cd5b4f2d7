//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::types::rev;
use crate::models::{Branch, FileStatus, StatusFile};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print `value` as pretty JSON.
pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `YYYY-MM-DD`, or blank when unknown.
pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Short form of a revision.
pub fn format_sha(sha: &str) -> String {
    rev::shorten(sha)
}

/// Branch name with a current marker and tracking summary.
///
/// ```
/// use gitscope::models::{Branch, Upstream};
/// use gitscope::ui::output::format_branch;
///
/// let branch = Branch {
///     repo_path: "/r".into(),
///     name: "main".into(),
///     remote: false,
///     current: true,
///     sha: None,
///     upstream: Some(Upstream { name: "origin/main".into(), missing: false }),
///     ahead: 1,
///     behind: 2,
///     date: None,
///     detached: false,
///     rebasing: false,
/// };
/// assert_eq!(format_branch(&branch), "* main [origin/main: ahead 1, behind 2]");
/// ```
pub fn format_branch(branch: &Branch) -> String {
    let marker = if branch.current { "* " } else { "  " };
    let mut line = format!("{}{}", marker, branch.name);
    if branch.rebasing {
        line.push_str(" (rebasing)");
    }

    if let Some(upstream) = &branch.upstream {
        let mut tracking = Vec::new();
        if upstream.missing {
            tracking.push("gone".to_string());
        }
        if branch.ahead > 0 {
            tracking.push(format!("ahead {}", branch.ahead));
        }
        if branch.behind > 0 {
            tracking.push(format!("behind {}", branch.behind));
        }
        if tracking.is_empty() {
            line.push_str(&format!(" [{}]", upstream.name));
        } else {
            line.push_str(&format!(" [{}: {}]", upstream.name, tracking.join(", ")));
        }
    }
    line
}

/// Two-letter status code (`XY`) and path, as `git status --short` shows it.
pub fn format_status(file: &StatusFile) -> String {
    let code = |status: Option<FileStatus>| status.map(|s| s.code()).unwrap_or(' ');
    let path = match &file.original_path {
        Some(original) => format!("{} -> {}", original, file.path),
        None => file.path.clone(),
    };
    format!(
        "{}{} {}",
        code(file.index_status),
        code(file.working_tree_status),
        path
    )
}

/// Left-align cells into columns separated by two spaces.
pub fn columns(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..width)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            let last = row.len().saturating_sub(1);
            row.iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i == last {
                        cell.clone()
                    } else {
                        format!("{:<w$}", cell, w = widths[i])
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
