//! service::history
//!
//! Repository and file logs, commit search, paging and incoming activity.
//!
//! Every page carries the [`LogQuery`] that produced it. [`GitService::more`]
//! widens or advances that query; [`GitService::replay`] runs it again.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::GitService;
use crate::cache::keys::{self, LogKey};
use crate::cache::Cached;
use crate::core::types::rev;
use crate::git::builders::{self, FileLogArgs, LogArgs, ReflogArgs, SearchArgs};
use crate::git::GitError;
use crate::models::{GitLog, LogQuery, Reflog, ReflogRecord, SearchPattern};
use crate::parsers::format::LogFormat;
use crate::parsers::log::{parse_log, LogContext};
use crate::parsers::parse_reflog;

/// Reflog commands that bring commits in from elsewhere.
const INCOMING_COMMANDS: &[&str] = &["merge", "pull"];

/// Options of a repository log.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub reference: Option<String>,
    pub all: bool,
    /// Page size; the configured list limit when unset, unbounded when `0`
    pub limit: Option<usize>,
    /// Follow every parent of merges; on when unset
    pub merges: Option<bool>,
    pub reverse: bool,
    pub since: Option<String>,
    pub authors: Vec<String>,
}

/// Options of a file history.
#[derive(Debug, Clone, Default)]
pub struct FileLogOptions {
    pub reference: Option<String>,
    /// All branches; the configured default when unset
    pub all: Option<bool>,
    pub limit: Option<usize>,
    pub skip: usize,
    /// Follow renames; the configured default when unset
    pub renames: Option<bool>,
    pub reverse: bool,
    pub since: Option<String>,
    /// 1-based line range; such histories are never cached
    pub range: Option<(u32, u32)>,
}

/// Options of an incoming activity listing.
#[derive(Debug, Clone, Default)]
pub struct ReflogOptions {
    pub all: bool,
    pub branch: Option<String>,
    pub limit: Option<usize>,
    pub skip: usize,
}

// ============================================================================
// Search patterns
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchOperator {
    Message,
    Author,
    Commit,
    Change,
    File,
}

impl SearchOperator {
    const PREFIXES: &'static [(&'static str, SearchOperator)] = &[
        ("message:", SearchOperator::Message),
        ("=:", SearchOperator::Message),
        ("author:", SearchOperator::Author),
        ("@:", SearchOperator::Author),
        ("commit:", SearchOperator::Commit),
        ("#:", SearchOperator::Commit),
        ("change:", SearchOperator::Change),
        ("~:", SearchOperator::Change),
        ("file:", SearchOperator::File),
        ("?:", SearchOperator::File),
    ];

    fn split(token: &str) -> (SearchOperator, &str) {
        Self::PREFIXES
            .iter()
            .find_map(|(prefix, op)| token.strip_prefix(prefix).map(|value| (*op, value)))
            .unwrap_or((SearchOperator::Message, token))
    }
}

/// Whitespace-separated tokens; double quotes group words and are kept.
fn tokenize(pattern: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in pattern.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Operator values in first-seen operator order.
fn search_operations(pattern: &str) -> Vec<(SearchOperator, Vec<String>)> {
    let mut operations: Vec<(SearchOperator, Vec<String>)> = Vec::new();
    for token in tokenize(pattern) {
        let (op, value) = SearchOperator::split(&token);
        if value.is_empty() || value == "\"\"" {
            continue;
        }
        match operations.iter_mut().find(|(o, _)| *o == op) {
            Some((_, values)) => values.push(value.to_string()),
            None => operations.push((op, vec![value.to_string()])),
        }
    }
    operations
}

/// Arguments after `git log`/`git show` for a search, and whether the
/// search names commits directly (`git show`).
fn search_args(search: &SearchPattern, similarity: Option<u8>) -> (Vec<String>, bool) {
    fn add(args: &mut Vec<String>, arg: String) {
        if !args.contains(&arg) {
            args.push(arg);
        }
    }
    let renames = match similarity {
        Some(s) => format!("-M{}%", s),
        None => "-M".to_string(),
    };

    let operations = search_operations(&search.pattern);
    let mut args: Vec<String> = Vec::new();
    let mut files: Vec<String> = Vec::new();

    if let Some((_, shas)) = operations.iter().find(|(op, _)| *op == SearchOperator::Commit) {
        add(&mut args, "-m".into());
        add(&mut args, renames);
        for sha in shas {
            add(&mut args, sha.replace('"', ""));
        }
        args.push("--".into());
        return (args, true);
    }

    let syntax = if search.match_regex {
        "--extended-regexp"
    } else {
        "--fixed-strings"
    };
    add(&mut args, renames);
    add(&mut args, "--all".into());
    add(&mut args, "--full-history".into());
    add(&mut args, syntax.into());
    if search.match_regex && !search.match_case {
        add(&mut args, "--regexp-ignore-case".into());
    }

    for (op, values) in &operations {
        match op {
            SearchOperator::Message => {
                add(&mut args, "-m".into());
                if search.match_all {
                    add(&mut args, "--all-match".into());
                }
                for value in values {
                    add(&mut args, format!("--grep={}", value.replace('"', "\\b")));
                }
            }
            SearchOperator::Author => {
                add(&mut args, "-m".into());
                for value in values {
                    add(&mut args, format!("--author={}", value.replace('"', "\\b")));
                }
            }
            SearchOperator::Change => {
                for value in values {
                    add(&mut args, format!("-G{}", value));
                }
            }
            SearchOperator::File => {
                files.extend(values.iter().map(|v| v.replace('"', "")));
            }
            SearchOperator::Commit => {}
        }
    }

    args.push("--".into());
    args.extend(files);
    (args, false)
}

// ============================================================================
// Service
// ============================================================================

impl GitService {
    /// Commits reachable from `reference` (HEAD by default).
    pub async fn log(&self, repo_path: &str, options: LogOptions) -> Option<GitLog> {
        let settings = self.settings();
        let query = LogQuery {
            repo_path: repo_path.to_string(),
            reference: options.reference,
            limit: settings.list_limit(options.limit),
            all: options.all,
            merges: options.merges.unwrap_or(true),
            since: options.since,
            authors: options.authors,
            ordering: settings.commit_ordering,
            reverse: options.reverse,
            ..Default::default()
        };
        self.replay(&query).await
    }

    /// History of a file or folder glob.
    ///
    /// Cached per document and option set. A request with a reference or a
    /// limit is answered from a cached complete history when that history
    /// contains the reference.
    pub async fn log_for_file(&self, path: &str, options: FileLogOptions) -> Cached<GitLog> {
        let (repo, file) = self.locate(path).await?;
        let settings = self.settings();
        let follow = options.renames.unwrap_or(settings.follow_renames);
        let query = LogQuery {
            repo_path: repo,
            file: Some(file),
            reference: options.reference,
            limit: settings.list_limit(options.limit),
            skip: options.skip,
            all: options.all.unwrap_or(settings.show_all_branches),
            follow,
            since: options.since,
            ordering: settings.commit_ordering.clone(),
            reverse: options.reverse,
            range: options
                .range
                .map(|(start, end)| (start.min(end), start.max(end))),
            first_parent: follow,
            ..Default::default()
        };

        if query.range.is_some() || !settings.caching_enabled {
            return self.replay(&query).await.map(Arc::new);
        }

        let doc = self.documents.get_or_add(path, Some(&query.repo_path));
        let key = keys::log(&LogKey {
            reference: query.reference.as_deref(),
            all: query.all,
            limit: query.limit,
            follow: query.follow,
            reverse: query.reverse,
            since: query.since.as_deref(),
            skip: query.skip,
        });

        if let Some(entry) = doc.log.get(&key) {
            debug!("cache hit: '{}'", key);
            return entry.value().await;
        }

        if query.reference.is_some() || query.limit.is_some() {
            let full_key = keys::full_log(query.follow, query.reverse);
            if let Some(entry) = doc.log.get(&full_key) {
                match query.reference.as_deref() {
                    None => {
                        debug!("cache hit: ~'{}'", key);
                        return entry.value().await;
                    }
                    Some(reference) => {
                        if let Some(full) = entry.value().await {
                            if !full.has_more && full.contains(reference) {
                                debug!("cache hit: '{}' within '{}'", key, full_key);
                                return Some(Arc::new(slice_from(&full, reference, &query)));
                            }
                        }
                    }
                }
            }
        }

        debug!("cache miss: '{}'", key);
        let this = self.clone();
        let reverse = query.reverse;
        let log = self
            .cached(&doc.log, &key, move || async move {
                this.file_log_core(&query).await
            })
            .await;
        if log.is_none() && reverse {
            doc.log.remove(&key);
        }
        log
    }

    /// Commits matching a search such as `author:ann message:"fix bug"`.
    pub async fn log_for_search(
        &self,
        repo_path: &str,
        search: &SearchPattern,
        limit: Option<usize>,
        skip: usize,
    ) -> Option<GitLog> {
        let settings = self.settings();
        let query = LogQuery {
            repo_path: repo_path.to_string(),
            limit: settings.search_limit(limit),
            skip,
            ordering: settings.commit_ordering,
            search: Some(search.clone()),
            ..Default::default()
        };
        self.replay(&query).await
    }

    /// Run `query` again.
    pub async fn replay(&self, query: &LogQuery) -> Option<GitLog> {
        let result = if query.search.is_some() {
            self.search_core(query).await
        } else if query.file.is_some() {
            self.file_log_core(query).await
        } else {
            self.log_core(query).await
        };
        result.unwrap_or_else(|err| {
            warn!("log of {} failed: {}", query.repo_path, err);
            None
        })
    }

    /// `log` extended by the next page of up to `limit` commits.
    ///
    /// Searches and all-branch logs advance with `--skip`; range and
    /// line-range logs are fetched again with a wider limit; everything else
    /// continues from the parent of the oldest commit. When nothing more is
    /// found the page is returned with `has_more` cleared.
    pub async fn more(&self, log: &GitLog, limit: Option<usize>) -> GitLog {
        let Some(query) = log.query.clone().filter(|_| log.has_more) else {
            return finished(log);
        };

        let settings = self.settings();
        let page = if query.search.is_some() {
            settings.search_limit(limit)
        } else {
            settings.list_limit(limit)
        };

        let is_range = query.reference.as_deref().is_some_and(rev::is_range);
        if query.range.is_some() || is_range {
            let widened = LogQuery {
                limit: page.map(|p| query.limit.unwrap_or(0) + p),
                ..query
            };
            return self
                .replay(&widened)
                .await
                .unwrap_or_else(|| finished(log));
        }

        let next = if query.search.is_some() || query.all {
            LogQuery {
                limit: page,
                skip: query.skip + log.count,
                ..query.clone()
            }
        } else {
            let Some(last) = log.last() else {
                return finished(log);
            };
            LogQuery {
                limit: page,
                skip: 0,
                reference: Some(format!("{}^", last.sha)),
                ..query.clone()
            }
        };

        let Some(more) = self.replay(&next).await else {
            return finished(log);
        };

        let has_more = more.has_more;
        let mut merged = log.clone();
        merged.merge(more);
        merged.limit = page.map(|p| log.limit.unwrap_or(0) + p);
        merged.has_more = has_more;
        merged.query = Some(query);
        merged
    }

    async fn log_core(&self, query: &LogQuery) -> Result<Option<GitLog>, GitError> {
        let similarity = self.settings().similarity_threshold;
        let data = self
            .git
            .exec(builders::log(&LogArgs {
                repo_path: &query.repo_path,
                reference: query.reference.as_deref(),
                format: LogFormat::Default,
                limit: query.limit,
                skip: query.skip,
                all: query.all,
                merges: query.merges,
                ordering: query.ordering.as_deref(),
                reverse: query.reverse,
                similarity,
                since: query.since.as_deref(),
                authors: &query.authors,
            }))
            .await?;
        Ok(parse_page(&data, query))
    }

    async fn file_log_core(&self, query: &LogQuery) -> Result<Option<GitLog>, GitError> {
        let file = query.file.as_deref().unwrap_or_default();
        if !self
            .is_tracked_in(&query.repo_path, file, query.reference.as_deref())
            .await
        {
            debug!("skipping log; '{}' is not tracked", file);
            return Ok(None);
        }

        let data = self
            .git
            .exec(builders::log_file(&FileLogArgs {
                repo_path: Some(&query.repo_path),
                file,
                reference: query.reference.as_deref(),
                format: LogFormat::Default,
                limit: query.limit,
                skip: query.skip,
                all: query.all,
                first_parent: query.first_parent,
                renames: query.follow,
                reverse: query.reverse,
                ordering: query.ordering.as_deref(),
                since: query.since.as_deref(),
                filters: "",
                lines: query.range,
            }))
            .await?;
        Ok(parse_page(&data, query))
    }

    async fn search_core(&self, query: &LogQuery) -> Result<Option<GitLog>, GitError> {
        let Some(search) = query.search.as_ref() else {
            return Ok(None);
        };
        let (args, use_show) = search_args(search, self.settings().similarity_threshold);
        let data = self
            .git
            .exec(builders::log_search(&SearchArgs {
                repo_path: &query.repo_path,
                search: &args,
                limit: query.limit,
                skip: query.skip,
                ordering: query.ordering.as_deref(),
                use_show,
            }))
            .await?;
        Ok(parse_page(&data, query))
    }

    // ========================================================================
    // Reflog
    // ========================================================================

    /// Merges and pulls recorded in the reflog, newest first.
    ///
    /// The reflog is read a hundred entries per wanted record because only
    /// some entries are incoming. `total` is the number of entries consumed,
    /// which is where the next page starts.
    pub async fn incoming_activity(
        &self,
        repo_path: &str,
        options: &ReflogOptions,
    ) -> Option<Reflog> {
        let settings = self.settings();
        let limit = options.limit.unwrap_or(settings.max_list_items);
        let raw_limit = limit.saturating_mul(100);

        let data = self
            .git
            .exec(builders::reflog(&ReflogArgs {
                repo_path,
                all: options.all,
                branch: options.branch.as_deref(),
                limit: Some(raw_limit).filter(|l| *l > 0),
                skip: options.skip,
                ordering: settings.ordering(),
            }))
            .await
            .map_err(|err| warn!("reflog of {} failed: {}", repo_path, err))
            .ok()?;
        if data.trim().is_empty() {
            return None;
        }

        Some(collect_incoming(
            repo_path,
            parse_reflog(&data),
            limit,
            raw_limit,
        ))
    }

    /// `reflog` extended by the next page of up to `limit` records.
    pub async fn more_activity(
        &self,
        reflog: &Reflog,
        options: &ReflogOptions,
        limit: Option<usize>,
    ) -> Reflog {
        if !reflog.has_more {
            return reflog.clone();
        }

        let limit = limit.unwrap_or(self.settings().max_list_items);
        let next = ReflogOptions {
            limit: Some(limit),
            skip: options.skip + reflog.total,
            ..options.clone()
        };
        let Some(more) = self.incoming_activity(&reflog.repo_path, &next).await else {
            return Reflog {
                has_more: false,
                ..reflog.clone()
            };
        };

        let mut records = reflog.records.clone();
        records.extend(more.records);
        Reflog {
            repo_path: reflog.repo_path.clone(),
            records,
            total: reflog.total + more.total,
            limit: reflog.limit + limit,
            has_more: more.has_more,
        }
    }
}

fn parse_page(data: &str, query: &LogQuery) -> Option<GitLog> {
    let mut log = parse_log(
        data,
        &LogContext {
            repo_path: &query.repo_path,
            limit: query.limit,
        },
    )?;
    log.query = Some(query.clone());
    Some(log)
}

fn finished(log: &GitLog) -> GitLog {
    GitLog {
        has_more: false,
        ..log.clone()
    }
}

/// Commits of `log` from `reference` on, at most `query.limit` of them.
fn slice_from(log: &GitLog, reference: &str, query: &LogQuery) -> GitLog {
    let commits: Vec<_> = log
        .commits
        .iter()
        .skip_while(|c| c.sha != reference)
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    let mut authors = BTreeMap::new();
    for commit in &commits {
        if let Some(author) = log.authors.get(&commit.author) {
            authors.insert(commit.author.clone(), author.clone());
        }
    }

    GitLog {
        repo_path: log.repo_path.clone(),
        count: commits.len(),
        commits,
        authors,
        limit: query.limit,
        has_more: false,
        query: Some(query.clone()),
    }
}

fn collect_incoming(
    repo_path: &str,
    entries: Vec<ReflogRecord>,
    limit: usize,
    raw_limit: usize,
) -> Reflog {
    let available = entries.len();
    let mut records = Vec::new();
    let mut total = 0;

    for entry in entries {
        if limit > 0 && records.len() >= limit {
            break;
        }
        total += 1;
        if INCOMING_COMMANDS.contains(&entry.command.as_str()) {
            records.push(entry);
        }
    }

    let filled = limit > 0 && records.len() >= limit && total < available;
    let truncated = raw_limit > 0 && available >= raw_limit;
    Reflog {
        repo_path: repo_path.to_string(),
        records,
        total,
        limit,
        has_more: filled || truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::git::mock::MockRunner;

    const FILE: &str = "/work/repo/src/lib.rs";

    fn sha(n: u8) -> String {
        format!("{:0>40}", n)
    }

    /// Default-format records for `shas`, newest first.
    fn log_output(shas: &[String]) -> String {
        shas.iter()
            .map(|s| {
                format!(
                    "</f>\n<r> {}\n<a> Ann\n<e> ann@example.com\n<d> 1700000000\n<c> 1700000000\n<p>\n<s>\nChange {}\n</s>\n<f>\n\nM\tsrc/lib.rs\n",
                    s, s
                )
            })
            .collect()
    }

    mod search_patterns {
        use super::*;

        #[test]
        fn bare_words_are_message_terms() {
            let ops = search_operations("fix   \"null pointer\" author:ann");
            assert_eq!(
                ops,
                vec![
                    (
                        SearchOperator::Message,
                        vec!["fix".to_string(), "\"null pointer\"".to_string()]
                    ),
                    (SearchOperator::Author, vec!["ann".to_string()]),
                ]
            );
        }

        #[test]
        fn short_operators_map_to_long_ones() {
            let ops = search_operations("@:bob ~:parse ?:src/*.rs =:wip");
            let kinds: Vec<SearchOperator> = ops.iter().map(|(op, _)| *op).collect();
            assert_eq!(
                kinds,
                [
                    SearchOperator::Author,
                    SearchOperator::Change,
                    SearchOperator::File,
                    SearchOperator::Message
                ]
            );
        }

        #[test]
        fn message_and_file_arguments() {
            let search = SearchPattern::new("message:\"fix bug\" file:src/lib.rs");
            let (args, use_show) = search_args(&search, Some(50));
            assert!(!use_show);
            assert_eq!(
                args,
                [
                    "-M50%",
                    "--all",
                    "--full-history",
                    "--extended-regexp",
                    "--regexp-ignore-case",
                    "-m",
                    "--grep=\\bfix bug\\b",
                    "--",
                    "src/lib.rs",
                ]
            );
        }

        #[test]
        fn fixed_strings_and_match_all() {
            let search = SearchPattern {
                match_all: true,
                match_regex: false,
                ..SearchPattern::new("one two")
            };
            let (args, _) = search_args(&search, None);
            assert!(args.contains(&"--fixed-strings".to_string()));
            assert!(args.contains(&"--all-match".to_string()));
            assert!(!args.contains(&"--regexp-ignore-case".to_string()));
            assert_eq!(args.iter().filter(|a| a.starts_with("--grep=")).count(), 2);
        }

        #[test]
        fn commit_search_uses_show() {
            let (args, use_show) = search_args(&SearchPattern::new("commit:abc123 author:x"), None);
            assert!(use_show);
            assert_eq!(args, ["-m", "-M", "abc123", "--"]);
        }
    }

    mod repository_log {
        use super::*;

        #[tokio::test]
        async fn asks_for_one_extra_commit() {
            let mock = MockRunner::new();
            mock.respond(&["log", "-n3"], &log_output(&[sha(1), sha(2), sha(3)]));
            let service = service(&mock);

            let log = service
                .log(
                    REPO,
                    LogOptions {
                        limit: Some(2),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(log.count, 2);
            assert!(log.has_more);
            assert_eq!(log.query.as_ref().unwrap().limit, Some(2));
        }

        #[tokio::test]
        async fn more_continues_from_oldest_parent() {
            let mock = MockRunner::new();
            let anchor = format!("{}^", sha(2));
            mock.respond(&["log", anchor.as_str()], &log_output(&[sha(3)]));
            mock.respond(&["log"], &log_output(&[sha(1), sha(2), sha(3)]));
            let service = service(&mock);

            let first = service
                .log(
                    REPO,
                    LogOptions {
                        limit: Some(2),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            let merged = service.more(&first, Some(2)).await;
            assert_eq!(merged.count, 3);
            assert!(!merged.has_more);
            assert_eq!(merged.limit, Some(4));
            assert_eq!(mock.count(&[anchor.as_str()]), 1);

            let again = service.more(&merged, None).await;
            assert_eq!(again.count, 3);
            assert_eq!(mock.count(&["log"]), 2);
        }

        #[tokio::test]
        async fn failure_yields_none() {
            let mock = MockRunner::new();
            mock.fail(&["log"], "fatal: bad revision 'nope'\n");
            let service = service(&mock);
            let log = service
                .log(
                    REPO,
                    LogOptions {
                        reference: Some("nope".into()),
                        ..Default::default()
                    },
                )
                .await;
            assert!(log.is_none());
        }
    }

    mod file_log {
        use super::*;

        fn tracked(mock: &MockRunner) {
            mock.respond(&["ls-files"], "src/lib.rs\n");
        }

        #[tokio::test]
        async fn cached_per_options() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["log"], &log_output(&[sha(1), sha(2)]));
            let service = service(&mock);

            let a = service.log_for_file(FILE, FileLogOptions::default()).await.unwrap();
            let b = service.log_for_file(FILE, FileLogOptions::default()).await.unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(a.count, 2);

            service
                .log_for_file(
                    FILE,
                    FileLogOptions {
                        all: Some(true),
                        ..Default::default()
                    },
                )
                .await;
            assert_eq!(mock.count(&["log"]), 2);
        }

        #[tokio::test]
        async fn reference_is_sliced_from_complete_history() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["log"], &log_output(&[sha(1), sha(2), sha(3)]));
            let service = service(&mock);

            let full = service
                .log_for_file(
                    FILE,
                    FileLogOptions {
                        limit: Some(0),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(full.count, 3);

            let sliced = service
                .log_for_file(
                    FILE,
                    FileLogOptions {
                        reference: Some(sha(2)),
                        limit: Some(1),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(sliced.count, 1);
            assert_eq!(sliced.commits[0].sha, sha(2));
            assert_eq!(mock.count(&["log"]), 1);
        }

        #[tokio::test]
        async fn line_ranges_are_never_cached() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["log"], &log_output(&[sha(1)]));
            let service = service(&mock);

            let options = FileLogOptions {
                range: Some((9, 3)),
                ..Default::default()
            };
            service.log_for_file(FILE, options.clone()).await.unwrap();
            let log = service.log_for_file(FILE, options).await.unwrap();
            assert_eq!(log.query.as_ref().unwrap().range, Some((3, 9)));
            assert_eq!(mock.count(&["log", "-L3,9:src/lib.rs"]), 2);
            assert!(service.documents().get(FILE).is_none());
        }

        #[tokio::test]
        async fn untracked_file_has_no_history() {
            let mock = MockRunner::new();
            let service = service(&mock);
            assert!(service
                .log_for_file(FILE, FileLogOptions::default())
                .await
                .is_none());
            assert_eq!(mock.count(&["log"]), 0);
        }
    }

    mod search {
        use super::*;

        #[tokio::test]
        async fn more_skips_what_was_seen() {
            let mock = MockRunner::new();
            mock.respond(&["log", "--skip=2"], &log_output(&[sha(3)]));
            mock.respond(&["log"], &log_output(&[sha(1), sha(2), sha(3)]));
            let service = service(&mock);

            let first = service
                .log_for_search(REPO, &SearchPattern::new("author:ann"), Some(2), 0)
                .await
                .unwrap();
            assert!(first.has_more);
            assert_eq!(mock.count(&["--author=ann"]), 1);

            let merged = service.more(&first, Some(2)).await;
            assert_eq!(merged.count, 3);
            assert!(!merged.has_more);
            assert_eq!(mock.count(&["--skip=2"]), 1);
        }
    }

    mod reflog {
        use super::*;
        use crate::service::ServiceSettings;

        fn reflog_output() -> String {
            reflog_output_lines().join("\n")
        }

        fn reflog_output_lines() -> Vec<&'static str> {
            vec![
                "<r> 1111111<d> HEAD@{2024-01-03 10:00:00 +0000}<s>pull origin main: Fast-forward",
                "<r> 2222222<d> HEAD@{2024-01-02 10:00:00 +0000}<s>checkout: moving from a to main",
                "<r> 3333333<d> HEAD@{2024-01-01 10:00:00 +0000}<s>merge feature: Merge made by the 'ort' strategy.",
                "<r> 4444444<d> HEAD@{2023-12-31 10:00:00 +0000}<s>commit: work",
            ]
        }

        #[test]
        fn only_incoming_commands_are_kept() {
            let reflog = collect_incoming(REPO, parse_reflog(&reflog_output()), 0, 0);
            let commands: Vec<&str> = reflog.records.iter().map(|r| r.command.as_str()).collect();
            assert_eq!(commands, ["pull", "merge"]);
            assert_eq!(reflog.total, 4);
            assert!(!reflog.has_more);
        }

        #[test]
        fn filled_page_reports_consumed_entries() {
            let reflog = collect_incoming(REPO, parse_reflog(&reflog_output()), 1, 100);
            assert_eq!(reflog.records.len(), 1);
            assert_eq!(reflog.total, 1);
            assert!(reflog.has_more);
        }

        #[tokio::test]
        async fn follow_up_pages_default_to_the_list_size() {
            let mock = MockRunner::new();
            let rest: Vec<&str> = reflog_output_lines().into_iter().skip(1).collect();
            mock.respond(&["--skip=1"], &rest.join("\n"));
            mock.respond(&["--walk-reflogs"], &reflog_output());
            let service = service_with(
                &mock,
                ServiceSettings {
                    max_list_items: 1,
                    max_search_items: 50,
                    ..Default::default()
                },
            );

            let first = service
                .incoming_activity(REPO, &ReflogOptions::default())
                .await
                .unwrap();
            service.more_activity(&first, &ReflogOptions::default(), None).await;
            assert_eq!(mock.count(&["-n100"]), 2);
            assert_eq!(mock.count(&["-n5000"]), 0);
        }

        #[tokio::test]
        async fn more_activity_skips_consumed_entries() {
            let mock = MockRunner::new();
            let rest: Vec<&str> = reflog_output_lines().into_iter().skip(1).collect();
            mock.respond(&["--skip=1"], &rest.join("\n"));
            mock.respond(&["--walk-reflogs"], &reflog_output());
            let service = service(&mock);

            let options = ReflogOptions {
                limit: Some(1),
                ..Default::default()
            };
            let first = service.incoming_activity(REPO, &options).await.unwrap();
            assert_eq!(mock.count(&["-n100"]), 1);
            assert_eq!(first.records[0].command, "pull");

            let merged = service.more_activity(&first, &options, Some(5)).await;
            assert_eq!(merged.records.len(), 2);
            assert_eq!(merged.records[1].command, "merge");
            assert_eq!(merged.total, 4);
            assert!(!merged.has_more);
        }
    }
}
