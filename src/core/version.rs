//! core::version
//!
//! Installed git version detection and feature gating.
//!
//! Several flags are only understood by newer git releases. Builders ask the
//! detected [`GitVersion`] before appending them; operations that cannot run
//! at all on an older git raise [`GitError::VersionRequirement`].
//!
//! # Example
//!
//! ```
//! use gitscope::core::version::GitVersion;
//!
//! let v = GitVersion::parse("git version 2.39.2.windows.1").unwrap();
//! assert_eq!(v.to_string(), "2.39.2");
//! assert!(v.at_least(2, 18));
//! assert!(!GitVersion::new(2, 10, 0).at_least(2, 11));
//! ```

use std::fmt;

use crate::git::errors::GitError;

/// A parsed `major.minor.patch` git version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the output of `git --version` or a bare dotted version.
    ///
    /// Vendor suffixes (`.windows.1`, ` (Apple Git-143)`) are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_prefix("git version").unwrap_or(text).trim();
        let token = text.split_whitespace().next()?;

        let mut parts = token.split('.').map(|p| {
            let digits: String = p.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        });

        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }

    /// True when this version is at least `major.minor`.
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    /// True when this version is at least `required`.
    pub fn at_least_version(&self, required: GitVersion) -> bool {
        *self >= required
    }

    /// Fail with a descriptive error unless this version meets `required`.
    ///
    /// `prefix` names the feature ("Stashing individual files") and `suffix`
    /// is appended verbatim after the sentence.
    pub fn ensure(&self, required: GitVersion, prefix: &str, suffix: &str) -> Result<(), GitError> {
        if self.at_least_version(required) {
            return Ok(());
        }
        Err(GitError::VersionRequirement {
            prefix: prefix.to_string(),
            required: required.to_string(),
            current: self.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Minimum versions for gated features.
pub mod requirements {
    use super::GitVersion;

    /// `git status --porcelain=v2`
    pub const STATUS_PORCELAIN_V2: GitVersion = GitVersion::new(2, 11, 0);
    /// `git stash push -- <pathspec>`
    pub const STASH_PATHSPECS: GitVersion = GitVersion::new(2, 13, 2);
    /// `git status --find-renames`
    pub const STATUS_FIND_RENAMES: GitVersion = GitVersion::new(2, 18, 0);
    /// `git blame --ignore-revs-file`
    pub const BLAME_IGNORE_REVS_FILE: GitVersion = GitVersion::new(2, 23, 0);
    /// `--pathspec-from-file=-` for stash push
    pub const PATHSPEC_FROM_STDIN: GitVersion = GitVersion::new(2, 30, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain() {
        assert_eq!(
            GitVersion::parse("git version 2.43.0"),
            Some(GitVersion::new(2, 43, 0))
        );
    }

    #[test]
    fn parse_vendor_suffixes() {
        assert_eq!(
            GitVersion::parse("git version 2.39.2.windows.1"),
            Some(GitVersion::new(2, 39, 2))
        );
        assert_eq!(
            GitVersion::parse("git version 2.37.1 (Apple Git-137.1)\n"),
            Some(GitVersion::new(2, 37, 1))
        );
        assert_eq!(GitVersion::parse("2.30"), Some(GitVersion::new(2, 30, 0)));
    }

    #[test]
    fn parse_garbage() {
        assert_eq!(GitVersion::parse(""), None);
        assert_eq!(GitVersion::parse("git version"), None);
        assert_eq!(GitVersion::parse("not a version"), None);
    }

    #[test]
    fn ordering() {
        assert!(GitVersion::new(2, 10, 0) < GitVersion::new(2, 11, 0));
        assert!(GitVersion::new(2, 13, 2) > GitVersion::new(2, 13, 1));
        assert!(GitVersion::new(3, 0, 0).at_least(2, 30));
        assert!(!GitVersion::new(2, 10, 9).at_least(2, 11));
    }

    #[test]
    fn ensure_reports_both_versions() {
        let err = GitVersion::new(2, 10, 0)
            .ensure(requirements::STASH_PATHSPECS, "Stashing individual files", "")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Stashing individual files requires a newer version of Git (>= 2.13.2) than is currently installed (2.10.0)."
        );
        assert!(GitVersion::new(2, 13, 2)
            .ensure(requirements::STASH_PATHSPECS, "x", "")
            .is_ok());
    }
}
