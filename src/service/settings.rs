//! service::settings
//!
//! Tunables the service reads on every call.
//!
//! The service never loads files itself; the embedding application (or the
//! `gscope` binary) builds a [`ServiceSettings`] from its configuration and
//! hands it over, and may replace it later with
//! [`GitService::update_settings`](super::GitService::update_settings).

use std::time::Duration;

use crate::core::config::Config;

/// Per-call configuration of the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// Git executable, `git` on `PATH` by default
    pub git_path: String,
    /// Directory levels scanned below a workspace folder
    pub search_depth: usize,
    pub search_excludes: Vec<String>,
    /// When off, document results are recomputed on every call
    pub caching_enabled: bool,
    pub similarity_threshold: Option<u8>,
    pub max_list_items: usize,
    pub max_search_items: usize,
    pub commit_ordering: Option<String>,
    pub blame_ignore_whitespace: bool,
    pub blame_custom_arguments: Vec<String>,
    pub follow_renames: bool,
    pub show_all_branches: bool,
    /// Preferred remote when several have providers
    pub default_remote: Option<String>,
    /// Limit on a single provider lookup
    pub provider_timeout: Option<Duration>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            git_path: "git".to_string(),
            search_depth: Config::DEFAULT_SEARCH_DEPTH,
            search_excludes: vec!["node_modules".to_string()],
            caching_enabled: true,
            similarity_threshold: None,
            max_list_items: Config::DEFAULT_MAX_LIST_ITEMS,
            max_search_items: Config::DEFAULT_MAX_SEARCH_ITEMS,
            commit_ordering: None,
            blame_ignore_whitespace: false,
            blame_custom_arguments: Vec::new(),
            follow_renames: true,
            show_all_branches: false,
            default_remote: None,
            provider_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            git_path: config.git_path().to_string(),
            search_depth: config.search_depth(),
            search_excludes: config.search_excludes(),
            caching_enabled: config.caching_enabled(),
            similarity_threshold: config.similarity_threshold(),
            max_list_items: config.max_list_items(),
            max_search_items: config.max_search_items(),
            commit_ordering: config.commit_ordering().map(str::to_string),
            blame_ignore_whitespace: config.blame_ignore_whitespace(),
            blame_custom_arguments: config.blame_custom_arguments(),
            follow_renames: config.follow_renames(),
            show_all_branches: config.show_all_branches(),
            ..Self::default()
        }
    }
}

impl ServiceSettings {
    pub fn ordering(&self) -> Option<&str> {
        self.commit_ordering.as_deref()
    }

    /// Page size, where `0` means unbounded.
    pub(crate) fn list_limit(&self, limit: Option<usize>) -> Option<usize> {
        Some(limit.unwrap_or(self.max_list_items)).filter(|l| *l > 0)
    }

    pub(crate) fn search_limit(&self, limit: Option<usize>) -> Option<usize> {
        Some(limit.unwrap_or(self.max_search_items)).filter(|l| *l > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let settings = ServiceSettings::from(&Config::default());
        assert_eq!(settings, ServiceSettings::default());
    }

    #[test]
    fn zero_limit_is_unbounded() {
        let settings = ServiceSettings {
            max_list_items: 0,
            ..Default::default()
        };
        assert_eq!(settings.list_limit(None), None);
        assert_eq!(settings.list_limit(Some(5)), Some(5));
        assert_eq!(settings.search_limit(None), Some(Config::DEFAULT_MAX_SEARCH_ITEMS));
    }
}
