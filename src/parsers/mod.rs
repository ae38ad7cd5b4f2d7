//! parsers
//!
//! Pure functions from git output text to [`crate::models`] records.
//!
//! # Design
//!
//! Parsers never fail: malformed lines are skipped, and empty output maps
//! to `None` (single records) or an empty `Vec` (listings). The format
//! strings they expect live in [`format`], next to the markers.

pub mod blame;
pub mod diff;
pub mod format;
pub mod log;
pub mod refs;
pub mod status;
pub mod tree;

pub use blame::parse_blame;
pub use diff::{parse_diff, parse_name_status, parse_shortstat};
pub use format::LogFormat;
pub use log::{parse_log, parse_log_refs, LogContext};
pub use refs::{
    parse_branches, parse_current_branch, parse_left_right_count, parse_reflog, parse_remotes,
    parse_shortlog, parse_tags,
};
pub use status::{parse_stash, parse_status};
pub use tree::{parse_files, parse_tree};
