//! models
//!
//! Immutable domain records built from git output.
//!
//! Records are produced by [`crate::parsers`]. The only records built
//! elsewhere are the synthesized current branch (detached HEAD, no commits
//! yet) in the service.

pub mod blame;
pub mod commit;
pub mod diff;
pub mod refs;
pub mod repository;
pub mod status;

pub use blame::{BlameAuthor, BlameCommit, BlameLine, GitBlame, GitBlameLine};
pub use commit::{
    Commit, CommitFile, DiffShortStat, FileStatus, GitLog, LineStats, LogAuthor, LogQuery,
    SearchPattern,
};
pub use diff::{DiffHunk, DiffHunkLine, GitDiff, HunkLine, HunkLineKind, HunkRange};
pub use refs::{AheadBehind, Branch, Remote, RemoteUrl, RemoteUrlKind, Tag, Upstream};
pub use repository::{
    Contributor, MergeStatus, RebaseStatus, StateRef, TreeEntry, TreeEntryKind, User,
};
pub use status::{Reflog, ReflogRecord, RepoStatus, Stash, StashEntry, StatusFile};
