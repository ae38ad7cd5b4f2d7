//! parsers::format
//!
//! Format strings passed to git, and the markers the parsers look for.
//!
//! Builders and parsers meet here: every `--format` a builder sends is a
//! constant in this module, and the matching parser reads exactly the
//! markers these constants emit. Log-style formats use `%x3c`/`%x3e` for
//! `<`/`>` so that commit messages cannot be mistaken for markers by git's
//! own placeholder expansion.

use chrono::{DateTime, Utc};

/// Log format variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogFormat {
    /// Full records with message and name-status file list
    #[default]
    Default,
    /// Shas only
    Refs,
    /// Records without message or files
    Shortlog,
    /// `Shortlog` plus `--shortstat`
    ShortlogStats,
    /// Sha and dates, for file histories
    Simple,
}

impl LogFormat {
    pub fn format(&self) -> &'static str {
        match self {
            LogFormat::Default => LOG_DEFAULT,
            LogFormat::Refs => LOG_REFS,
            LogFormat::Shortlog | LogFormat::ShortlogStats => LOG_SHORTLOG,
            LogFormat::Simple => LOG_SIMPLE,
        }
    }

    pub fn is_shortlog(&self) -> bool {
        matches!(self, LogFormat::Shortlog | LogFormat::ShortlogStats)
    }
}

pub const RECORD_START: &str = "</f>";
pub const FILES_START: &str = "<f>";
pub const SHA: &str = "<r> ";
pub const AUTHOR: &str = "<a> ";
pub const EMAIL: &str = "<e> ";
pub const AUTHOR_DATE: &str = "<d> ";
pub const COMMITTER_DATE: &str = "<c> ";
pub const PARENTS: &str = "<p> ";
pub const SELECTOR: &str = "<l> ";
pub const MESSAGE_START: &str = "<s>";
pub const MESSAGE_END: &str = "</s>";

/// `git log --format=` for full records.
pub const LOG_DEFAULT: &str = "%x3c/f%x3e%n%x3cr%x3e %H%n%x3ca%x3e %aN%n%x3ce%x3e %aE%n%x3cd%x3e %at%n%x3cc%x3e %ct%n%x3cp%x3e %P%n%x3cs%x3e%n%B%n%x3c/s%x3e%n%x3cf%x3e";

/// `git log --format=` for sha listings.
pub const LOG_REFS: &str = "%x3cr%x3e %H";

/// `git log --format=` for author aggregation.
pub const LOG_SHORTLOG: &str = "%x3c/f%x3e%n%x3cr%x3e %H%n%x3ca%x3e %aN%n%x3ce%x3e %aE%n%x3cd%x3e %at%n%x3cc%x3e %ct%n%x3cf%x3e";

/// `git log --format=` for file histories that only need shas and dates.
pub const LOG_SIMPLE: &str = "%x3c/f%x3e%n%x3cr%x3e %H%n%x3cd%x3e %at%n%x3cc%x3e %ct%n%x3cp%x3e %P%n%x3cf%x3e";

/// `git stash list --format=`.
pub const STASH: &str = "%x3c/f%x3e%n%x3cr%x3e %H%n%x3cd%x3e %at%n%x3cc%x3e %ct%n%x3cl%x3e %gd%n%x3cs%x3e%n%B%n%x3c/s%x3e%n%x3cf%x3e";

/// `git for-each-ref --format=` for branches.
pub const BRANCH: &str =
    "<h>%(HEAD)<n>%(refname)<u>%(upstream:short)<t>%(upstream:track)<r>%(objectname)<d>%(committerdate:iso8601)";

/// `git tag -l --format=`.
pub const TAG: &str =
    "<n>%(refname:short)<r>%(objectname)<c>%(*objectname)<d>%(creatordate:iso8601)<s>%(subject)";

/// `git log --walk-reflogs --format=`.
pub const REFLOG: &str = "%x3cr%x3e %H%x3cd%x3e %gD%x3cs%x3e%gs";

/// Unix seconds to UTC.
pub fn parse_unix(text: &str) -> Option<DateTime<Utc>> {
    text.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Git's `iso8601` date (`2024-01-15 10:20:30 +0100`) to UTC.
pub fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
