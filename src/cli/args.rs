//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitscope - blame, history and repository state from git
#[derive(Parser, Debug)]
#[command(name = "gscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gscope was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; only errors are logged
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the repositories below the working directory
    #[command(
        name = "repos",
        long_about = "List the repositories below the working directory.\n\n\
            Scans to the configured search depth (or --depth), skipping excluded \
            folder names, and prints each repository with its current branch.",
        after_help = "\
EXAMPLES:
    # Repositories directly below the current folder
    gscope repos

    # Look two levels deep
    gscope repos --depth 2"
    )]
    Repos {
        /// Directory levels to scan
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Show who last changed each line of a file
    #[command(
        name = "blame",
        after_help = "\
EXAMPLES:
    # Blame the working tree version
    gscope blame src/main.rs

    # Blame lines 10 to 20 at a tag
    gscope blame src/main.rs -L 10,20 --rev v1.2.0"
    )]
    Blame {
        /// File to blame
        file: PathBuf,

        /// Revision to blame at (defaults to the working tree)
        #[arg(long = "rev")]
        reference: Option<String>,

        /// Line range `start,end` (1-based, inclusive)
        #[arg(short = 'L', value_parser = parse_range)]
        lines: Option<(u32, u32)>,
    },

    /// Show commit history of the repository or of a file
    #[command(
        name = "log",
        after_help = "\
EXAMPLES:
    # Recent commits
    gscope log

    # History of one file, following renames
    gscope log src/lib.rs

    # Search messages and authors
    gscope log --search \"@ann fix\""
    )]
    Log {
        /// File whose history to show
        file: Option<PathBuf>,

        /// Start from this revision
        #[arg(long = "rev")]
        reference: Option<String>,

        /// Maximum commits (0 for no limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Include every branch
        #[arg(short, long)]
        all: bool,

        /// Only commits by these authors
        #[arg(long = "author")]
        authors: Vec<String>,

        /// Only commits newer than this date
        #[arg(long)]
        since: Option<String>,

        /// Search query (`message:`, `author:`, `commit:`, `change:`, `file:`)
        #[arg(short, long, conflicts_with = "file")]
        search: Option<String>,

        /// Line range of FILE (`start,end`)
        #[arg(short = 'L', requires = "file", value_parser = parse_range)]
        lines: Option<(u32, u32)>,

        /// Show merge and pull activity from the reflog instead
        #[arg(long, conflicts_with_all = ["file", "search"])]
        incoming: bool,
    },

    /// Show working tree status
    Status {
        /// Only this file
        file: Option<PathBuf>,
    },

    /// List branches
    Branches {
        /// Include remote branches
        #[arg(short, long)]
        remote: bool,
    },

    /// List tags
    Tags,

    /// List stash entries
    Stash,

    /// List contributors by commit count
    Contributors {
        /// Include line and file totals
        #[arg(long)]
        stats: bool,
    },

    /// Show gscope and git versions
    Version,
}

/// Parse `start,end` into a 1-based inclusive range.
pub fn parse_range(s: &str) -> Result<(u32, u32), String> {
    let (start, end) = s
        .split_once(',')
        .ok_or_else(|| format!("expected start,end but got '{}'", s))?;
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start line '{}'", start))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end line '{}'", end))?;
    if start == 0 || end < start {
        return Err(format!("invalid line range {},{}", start, end));
    }
    Ok((start, end))
}
