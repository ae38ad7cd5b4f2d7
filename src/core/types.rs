//! core::types
//!
//! Revision vocabulary shared by builders, parsers and the service.
//!
//! # Types
//!
//! - [`rev`] - helpers classifying revision strings (shas, ranges, the
//!   uncommitted pseudo revisions)
//! - [`ContentHash`] - digest of unsaved document contents used in cache keys
//!
//! # Examples
//!
//! ```
//! use gitscope::core::types::rev;
//!
//! assert!(rev::is_sha("4b825dc642cb6eb9a060e54bf8d69288fbee4904"));
//! assert!(rev::is_uncommitted(rev::UNCOMMITTED));
//! assert!(rev::is_uncommitted_staged(rev::UNCOMMITTED_STAGED));
//! assert!(rev::is_range("main..feature"));
//! assert_eq!(rev::shorten("4b825dc642cb6eb9a060e54bf8d69288fbee4904"), "4b825dc");
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Revision string helpers.
pub mod rev {
    /// Tree object of an empty repository; stands in for the parent of a root commit.
    pub const ROOT_EMPTY_TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    /// Working tree pseudo revision.
    pub const UNCOMMITTED: &str = "0000000000000000000000000000000000000000";

    /// Index (staged) pseudo revision.
    pub const UNCOMMITTED_STAGED: &str = "0000000000000000000000000000000000000000:";

    /// Git's own spelling of the index revision (`git show :path`).
    pub const STAGED_SHORTHAND: &str = ":";

    /// Parent-of-first-parent marker git reports for a root commit.
    pub const ROOT_PARENT_MARKER: &str = "^3";

    /// Full 40 or 64 character hex object id.
    pub fn is_sha(rev: &str) -> bool {
        (rev.len() == 40 || rev.len() == 64) && rev.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Abbreviated or full object id, optionally followed by a parent suffix (`^`, `~2`).
    pub fn is_sha_like(rev: &str) -> bool {
        let base = rev
            .split(|c| c == '^' || c == '~')
            .next()
            .unwrap_or_default();
        (7..=64).contains(&base.len()) && base.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// True for the working tree or index pseudo revisions.
    pub fn is_uncommitted(rev: &str) -> bool {
        rev == UNCOMMITTED || rev == UNCOMMITTED_STAGED || rev == STAGED_SHORTHAND
    }

    /// True for the index pseudo revision.
    pub fn is_uncommitted_staged(rev: &str) -> bool {
        rev == UNCOMMITTED_STAGED || rev == STAGED_SHORTHAND
    }

    /// True for `a..b` and `a...b` ranges.
    pub fn is_range(rev: &str) -> bool {
        rev.contains("..")
    }

    /// True when `rev` names the parent of something (`abc^`, `abc~1`).
    pub fn is_parent_ref(rev: &str) -> bool {
        rev.ends_with('^') || rev.ends_with("~1")
    }

    /// Short display form: 7 characters for shas, pseudo names for uncommitted.
    pub fn shorten(rev: &str) -> String {
        if is_uncommitted_staged(rev) {
            return "Index".to_string();
        }
        if is_uncommitted(rev) {
            return "Working Tree".to_string();
        }
        if is_sha(rev) {
            return rev[..7].to_string();
        }
        rev.to_string()
    }

    /// Build a `left..right` range.
    pub fn range(left: &str, right: &str) -> String {
        format!("{}..{}", left, right)
    }
}

/// Digest of an in-memory document used to keep dirty-buffer cache entries
/// apart from committed ones.
///
/// # Example
///
/// ```
/// use gitscope::core::types::ContentHash;
///
/// let a = ContentHash::of("fn main() {}\n");
/// let b = ContentHash::of("fn main() {}\n");
/// assert_eq!(a, b);
/// assert_ne!(a, ContentHash::of(""));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(contents: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contents.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
