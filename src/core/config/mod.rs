//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! gitscope has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GITSCOPE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitscope/config.toml`
//! 3. `~/.gitscope/config.toml`
//!
//! # Repo Config Location
//!
//! `.git/gitscope/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitscope::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! let config = result.config;
//!
//! println!("git: {}", config.git_path());
//! println!("page size: {}", config.max_list_items());
//! ```

pub mod schema;

pub use schema::{BlameConfig, FileHistoryConfig, GlobalConfig, RepoConfig, SearchConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: repo values override global
/// values, which override built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Default page size for log queries.
    pub const DEFAULT_MAX_LIST_ITEMS: usize = 200;
    /// Default page size for searches.
    pub const DEFAULT_MAX_SEARCH_ITEMS: usize = 200;
    /// Default workspace scan depth.
    pub const DEFAULT_SEARCH_DEPTH: usize = 1;

    /// Load configuration from default locations.
    ///
    /// If `repo_path` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(repo_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global()?;

        let (repo, repo_path_found) = match repo_path {
            Some(path) => Self::load_repo(path, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path: repo_path_found,
            },
            warnings,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var("GITSCOPE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitscope/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gitscope/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load repository configuration.
    fn load_repo(
        repo_path: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let git_dir = repo_path.join(".git");
        if !git_dir.exists() {
            return Ok((None, None));
        }

        // Linked worktrees have a `.git` file; their config lives with the main repo.
        if git_dir.is_file() {
            warnings.push(ConfigWarning {
                message: "repository config is not read from linked worktrees".to_string(),
                path: git_dir,
            });
            return Ok((None, None));
        }

        let path = Self::repo_config_path(repo_path);
        if path.exists() {
            let config = Self::read_config(&path)?;
            return Ok((Some(config), Some(path)));
        }

        Ok((None, None))
    }

    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Canonical repo config path, `.git/gitscope/config.toml`.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/gitscope/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Git executable. Defaults to `git` on `PATH`.
    pub fn git_path(&self) -> &str {
        self.global.git_path.as_deref().unwrap_or("git")
    }

    pub fn search_depth(&self) -> usize {
        self.global
            .search_depth
            .unwrap_or(Self::DEFAULT_SEARCH_DEPTH)
    }

    /// Defaults to `true`.
    pub fn caching_enabled(&self) -> bool {
        self.global.caching_enabled.unwrap_or(true)
    }

    pub fn similarity_threshold(&self) -> Option<u8> {
        self.repo
            .as_ref()
            .and_then(|r| r.similarity_threshold)
            .or(self.global.similarity_threshold)
    }

    pub fn max_list_items(&self) -> usize {
        self.repo
            .as_ref()
            .and_then(|r| r.max_list_items)
            .or(self.global.max_list_items)
            .unwrap_or(Self::DEFAULT_MAX_LIST_ITEMS)
    }

    pub fn max_search_items(&self) -> usize {
        self.global
            .max_search_items
            .unwrap_or(Self::DEFAULT_MAX_SEARCH_ITEMS)
    }

    pub fn commit_ordering(&self) -> Option<&str> {
        self.repo
            .as_ref()
            .and_then(|r| r.commit_ordering.as_deref())
            .or(self.global.commit_ordering.as_deref())
    }

    fn blame(&self) -> impl Iterator<Item = &BlameConfig> {
        self.repo
            .as_ref()
            .and_then(|r| r.blame.as_ref())
            .into_iter()
            .chain(self.global.blame.as_ref())
    }

    fn file_history(&self) -> impl Iterator<Item = &FileHistoryConfig> {
        self.repo
            .as_ref()
            .and_then(|r| r.file_history.as_ref())
            .into_iter()
            .chain(self.global.file_history.as_ref())
    }

    /// Defaults to `false`.
    pub fn blame_ignore_whitespace(&self) -> bool {
        self.blame()
            .find_map(|b| b.ignore_whitespace)
            .unwrap_or(false)
    }

    pub fn blame_custom_arguments(&self) -> Vec<String> {
        self.blame()
            .find_map(|b| b.custom_arguments.clone())
            .unwrap_or_default()
    }

    /// Defaults to `true`.
    pub fn follow_renames(&self) -> bool {
        self.file_history()
            .find_map(|h| h.follow_renames)
            .unwrap_or(true)
    }

    /// Defaults to `false`.
    pub fn show_all_branches(&self) -> bool {
        self.file_history()
            .find_map(|h| h.show_all_branches)
            .unwrap_or(false)
    }

    pub fn search_excludes(&self) -> Vec<String> {
        self.global
            .search
            .as_ref()
            .and_then(|s| s.exclude.clone())
            .unwrap_or_else(|| vec!["node_modules".to_string()])
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let config = Config::default();

        assert_eq!(config.git_path(), "git");
        assert_eq!(config.search_depth(), 1);
        assert!(config.caching_enabled());
        assert_eq!(config.max_list_items(), 200);
        assert!(config.follow_renames());
        assert!(!config.show_all_branches());
        assert!(config.commit_ordering().is_none());
        assert!(config.blame_custom_arguments().is_empty());
    }

    #[test]
    fn load_global_from_env() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        fs::write(
            &config_path,
            r#"
            caching_enabled = false
            max_list_items = 50
            "#,
        )
        .unwrap();

        std::env::set_var("GITSCOPE_CONFIG", config_path.to_str().unwrap());
        let result = Config::load(None);
        std::env::remove_var("GITSCOPE_CONFIG");

        let config = result.unwrap().config;
        assert!(!config.caching_enabled());
        assert_eq!(config.max_list_items(), 50);
        assert_eq!(config.global_config_loaded_from(), Some(config_path.as_path()));
    }

    #[test]
    fn repo_overrides_global() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/gitscope");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
            commit_ordering = "topo"
            max_list_items = 10

            [blame]
            ignore_whitespace = true
            "#,
        )
        .unwrap();

        let result = Config::load(Some(temp.path())).unwrap();
        let mut config = result.config;
        config.global.max_list_items = Some(99);
        config.global.commit_ordering = Some("date".to_string());

        assert_eq!(config.commit_ordering(), Some("topo"));
        assert_eq!(config.max_list_items(), 10);
        assert!(config.blame_ignore_whitespace());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/gitscope");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "max_list_items = \"many\"").unwrap();

        let err = Config::load(Some(temp.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn worktree_git_file_warns() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".git"), "gitdir: /elsewhere").unwrap();

        let result = Config::load(Some(temp.path())).unwrap();
        assert!(result.config.repo.is_none());
        assert_eq!(result.warnings.len(), 1);
    }
}
