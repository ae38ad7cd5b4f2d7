//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GITSCOPE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitscope/config.toml`
//! 3. `~/.gitscope/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/gitscope/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing: similarity must be a percentage,
//! orderings must be ones git understands, and custom blame arguments must
//! not be blank.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Orderings accepted by `git log --<ordering>-order`.
pub const VALID_ORDERINGS: &[&str] = &["date", "author-date", "topo"];

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// git_path = "/usr/local/bin/git"
/// search_depth = 2
/// caching_enabled = true
/// similarity_threshold = 50
/// max_list_items = 200
/// commit_ordering = "topo"
///
/// [blame]
/// ignore_whitespace = true
/// custom_arguments = ["-C"]
///
/// [file_history]
/// follow_renames = true
/// show_all_branches = false
///
/// [search]
/// exclude = ["node_modules", "target"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Explicit git executable
    pub git_path: Option<String>,

    /// How many directory levels below a workspace folder to scan for repositories
    pub search_depth: Option<usize>,

    /// Cache parsed results per document
    pub caching_enabled: Option<bool>,

    /// Rename detection similarity (percent)
    pub similarity_threshold: Option<u8>,

    /// Default page size for log queries
    pub max_list_items: Option<usize>,

    /// Default page size for log searches
    pub max_search_items: Option<usize>,

    /// Commit ordering for log queries
    pub commit_ordering: Option<String>,

    /// Blame settings
    pub blame: Option<BlameConfig>,

    /// File history settings
    pub file_history: Option<FileHistoryConfig>,

    /// Repository discovery settings
    pub search: Option<SearchConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_similarity(self.similarity_threshold)?;
        validate_ordering(self.commit_ordering.as_deref())?;

        if let Some(git_path) = &self.git_path {
            if git_path.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "git_path cannot be empty".to_string(),
                ));
            }
        }

        if self.max_list_items == Some(0) || self.max_search_items == Some(0) {
            return Err(ConfigError::InvalidValue(
                "page sizes must be greater than zero".to_string(),
            ));
        }

        if let Some(blame) = &self.blame {
            blame.validate()?;
        }

        Ok(())
    }
}

/// Repository configuration. Overrides the global values for one repository.
///
/// # Example
///
/// ```toml
/// commit_ordering = "date"
///
/// [blame]
/// custom_arguments = ["--ignore-revs-file", ".git-blame-ignore-revs"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Rename detection similarity (percent)
    pub similarity_threshold: Option<u8>,

    /// Commit ordering for log queries
    pub commit_ordering: Option<String>,

    /// Default page size for log queries
    pub max_list_items: Option<usize>,

    /// Blame settings
    pub blame: Option<BlameConfig>,

    /// File history settings
    pub file_history: Option<FileHistoryConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_similarity(self.similarity_threshold)?;
        validate_ordering(self.commit_ordering.as_deref())?;

        if self.max_list_items == Some(0) {
            return Err(ConfigError::InvalidValue(
                "page sizes must be greater than zero".to_string(),
            ));
        }

        if let Some(blame) = &self.blame {
            blame.validate()?;
        }

        Ok(())
    }
}

/// Blame settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BlameConfig {
    /// Pass `-w`
    pub ignore_whitespace: Option<bool>,

    /// Extra arguments appended to every blame invocation
    pub custom_arguments: Option<Vec<String>>,
}

impl BlameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(args) = &self.custom_arguments {
            if args.iter().any(|a| a.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "blame custom_arguments cannot contain blank entries".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// File history settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileHistoryConfig {
    /// Follow renames (`--follow`)
    pub follow_renames: Option<bool>,

    /// Include commits from all branches (`--all`)
    pub show_all_branches: Option<bool>,
}

/// Repository discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Directory names never descended into
    pub exclude: Option<Vec<String>>,
}

fn validate_similarity(value: Option<u8>) -> Result<(), ConfigError> {
    match value {
        Some(v) if v > 100 => Err(ConfigError::InvalidValue(format!(
            "similarity_threshold must be between 0 and 100, got {}",
            v
        ))),
        _ => Ok(()),
    }
}

fn validate_ordering(value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(ordering) if !VALID_ORDERINGS.contains(&ordering) => {
            Err(ConfigError::InvalidValue(format!(
                "invalid commit_ordering '{}', must be one of: {}",
                ordering,
                VALID_ORDERINGS.join(", ")
            )))
        }
        _ => Ok(()),
    }
}
