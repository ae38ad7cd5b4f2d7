//! Blame, diff, log, show and reflog.

use crate::core::paths::{is_folder_glob, split_path};
use crate::core::types::rev;
use crate::git::command::{ErrorHandling, GitCommand};
use crate::git::runner::Encoding;
use crate::parsers::format::{self, LogFormat};

use super::{diff_filter, find_renames, ordering};

// ============================================================================
// blame
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BlameArgs<'a> {
    pub repo_path: Option<&'a str>,
    pub file: &'a str,
    pub reference: Option<&'a str>,
    pub ignore_whitespace: bool,
    /// 1-based inclusive line range
    pub lines: Option<(u32, u32)>,
    /// User-configured extra arguments
    pub custom_args: &'a [String],
    /// Keep `--ignore-revs-file <path>` from `custom_args`
    pub ignore_revs_usable: bool,
    /// Index contents, required when `reference` is the staged revision
    pub staged_contents: Option<&'a str>,
}

/// The `--ignore-revs-file` value in a custom argument list.
pub fn ignore_revs_file(custom_args: &[String]) -> Option<&str> {
    let index = custom_args.iter().position(|a| a == "--ignore-revs-file")?;
    custom_args.get(index + 1).map(String::as_str)
}

fn blame_params(
    ignore_whitespace: bool,
    lines: Option<(u32, u32)>,
    custom_args: &[String],
    ignore_revs_usable: bool,
) -> Vec<String> {
    let mut params: Vec<String> = vec!["blame".into(), "--root".into(), "--incremental".into()];
    if ignore_whitespace {
        params.push("-w".into());
    }
    if let Some((start, end)) = lines {
        params.push("-L".into());
        params.push(format!("{},{}", start, end));
    }

    let mut skip_next = false;
    for arg in custom_args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--ignore-revs-file" && !ignore_revs_usable {
            skip_next = true;
            continue;
        }
        params.push(arg.clone());
    }
    params
}

/// `git blame --root --incremental [-w] [-L a,b] [custom] [<ref>] -- <file>`.
pub fn blame(args: &BlameArgs<'_>) -> GitCommand {
    let (file, root) = split_path(args.file, args.repo_path);
    let mut params = blame_params(
        args.ignore_whitespace,
        args.lines,
        args.custom_args,
        args.ignore_revs_usable,
    );

    let mut stdin = None;
    match args.reference {
        Some(r) if rev::is_uncommitted_staged(r) => {
            params.push("--contents".into());
            params.push("-".into());
            stdin = Some(args.staged_contents.unwrap_or_default().as_bytes().to_vec());
        }
        Some(r) if !r.is_empty() => params.push(r.to_string()),
        _ => {}
    }
    params.push("--".into());
    params.push(file);

    let command = GitCommand::new(root, params);
    match stdin {
        Some(input) => command.stdin(input),
        None => command,
    }
}

/// Blame of unsaved contents, piped on stdin. `correlation_key` keeps
/// blames of different buffers apart.
pub fn blame_contents(args: &BlameArgs<'_>, contents: &str, correlation_key: &str) -> GitCommand {
    let (file, root) = split_path(args.file, args.repo_path);
    let mut params = blame_params(
        args.ignore_whitespace,
        args.lines,
        args.custom_args,
        args.ignore_revs_usable,
    );
    params.extend(["--contents".into(), "-".into(), "--".into(), file]);

    GitCommand::new(root, params)
        .stdin(contents.as_bytes().to_vec())
        .correlation_key(correlation_key)
}

// ============================================================================
// diff
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DiffArgs<'a> {
    pub repo_path: &'a str,
    pub file: &'a str,
    pub ref1: Option<&'a str>,
    pub ref2: Option<&'a str>,
    /// `-U<n>`
    pub context_lines: Option<u32>,
    pub renames: bool,
    pub similarity: Option<u8>,
    /// `--diff-filter` letters
    pub filters: &'a str,
    pub encoding: Encoding,
}

fn diff_ref(reference: &str) -> String {
    if rev::is_uncommitted_staged(reference) {
        "--staged".to_string()
    } else {
        reference.to_string()
    }
}

/// `git diff --no-ext-diff --minimal ... [<ref1>] [<ref2>] -- <file>`.
///
/// The parent of a stash's untracked-files commit (`<sha>^3^`) does not
/// exist and is replaced by the empty tree.
pub fn diff(args: &DiffArgs<'_>) -> GitCommand {
    let mut params: Vec<String> = vec!["diff".into(), "--no-ext-diff".into(), "--minimal".into()];
    if let Some(n) = args.context_lines {
        params.push(format!("-U{}", n));
    }
    if args.renames {
        params.push(find_renames(args.similarity));
    }
    params.extend(diff_filter(args.filters));

    if let Some(ref1) = args.ref1.filter(|r| !r.is_empty()) {
        if ref1.ends_with("^3^") {
            params.push(rev::ROOT_EMPTY_TREE_SHA.to_string());
        } else {
            params.push(diff_ref(ref1));
        }
    }
    if let Some(ref2) = args.ref2.filter(|r| !r.is_empty()) {
        params.push(diff_ref(ref2));
    }
    params.push("--".into());
    params.push(args.file.to_string());

    GitCommand::new(args.repo_path, params)
        .config("color.diff", "false")
        .encoding(args.encoding)
}

/// Diff of a tracked file against unsaved contents on stdin.
pub fn diff_contents(
    repo_path: &str,
    file: &str,
    contents: &str,
    similarity: Option<u8>,
    filters: &str,
) -> GitCommand {
    let mut params: Vec<String> = vec![
        "diff".into(),
        find_renames(similarity),
        "--no-ext-diff".into(),
        "-U0".into(),
        "--minimal".into(),
    ];
    params.extend(diff_filter(filters));
    params.extend([
        "--no-index".into(),
        "--".into(),
        file.to_string(),
        "-".into(),
    ]);

    GitCommand::new(repo_path, params)
        .config("color.diff", "false")
        .stdin(contents.as_bytes().to_vec())
}

/// `git diff --name-status` between two refs (or the working tree).
pub fn diff_name_status(
    repo_path: &str,
    ref1: Option<&str>,
    ref2: Option<&str>,
    similarity: Option<u8>,
    filters: &str,
) -> GitCommand {
    let mut params: Vec<String> = vec![
        "diff".into(),
        "--name-status".into(),
        find_renames(similarity),
        "--no-ext-diff".into(),
    ];
    params.extend(diff_filter(filters));
    params.extend(ref1.map(str::to_string));
    params.extend(ref2.map(str::to_string));
    params.push("--".into());

    GitCommand::new(repo_path, params).config("color.diff", "false")
}

/// `git diff --shortstat [<ref>]`.
pub fn diff_shortstat(repo_path: &str, reference: Option<&str>) -> GitCommand {
    let mut params: Vec<String> = vec!["diff".into(), "--shortstat".into(), "--no-ext-diff".into()];
    params.extend(reference.map(str::to_string));
    params.push("--".into());
    GitCommand::new(repo_path, params).config("color.diff", "false")
}

// ============================================================================
// log
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogArgs<'a> {
    pub repo_path: &'a str,
    pub reference: Option<&'a str>,
    pub format: LogFormat,
    /// Page size; git is asked for one more to detect further pages
    pub limit: Option<usize>,
    pub skip: usize,
    pub all: bool,
    /// Follow every parent of merges instead of `--first-parent`
    pub merges: bool,
    pub ordering: Option<&'a str>,
    /// Walk from `reference` towards HEAD
    pub reverse: bool,
    pub similarity: Option<u8>,
    pub since: Option<&'a str>,
    pub authors: &'a [String],
}

fn push_reference(params: &mut Vec<String>, reference: Option<&str>, reverse: bool) {
    let Some(r) = reference.filter(|r| !r.is_empty() && !rev::is_uncommitted_staged(r)) else {
        return;
    };
    if reverse {
        params.push("--reverse".into());
        params.push("--ancestry-path".into());
        params.push(format!("{}..HEAD", r));
    } else {
        params.push(r.to_string());
    }
}

/// Repository log.
pub fn log(args: &LogArgs<'_>) -> GitCommand {
    let mut params: Vec<String> = vec![
        "log".into(),
        format!("--format={}", args.format.format()),
        "--full-history".into(),
        find_renames(args.similarity),
        "-m".into(),
    ];

    match args.format {
        LogFormat::Default | LogFormat::Simple => params.push("--name-status".into()),
        LogFormat::ShortlogStats => params.push("--shortstat".into()),
        LogFormat::Refs | LogFormat::Shortlog => {}
    }

    params.extend(ordering(args.ordering));
    if let Some(limit) = args.limit.filter(|l| *l > 0) {
        if !args.reverse {
            params.push(format!("-n{}", limit + 1));
        }
    }
    if args.skip > 0 {
        params.push(format!("--skip={}", args.skip));
    }
    if let Some(since) = args.since {
        params.push(format!("--since={}", since));
    }
    if !args.merges {
        params.push("--first-parent".into());
    }
    if !args.authors.is_empty() {
        params.push("--use-mailmap".into());
        params.extend(args.authors.iter().map(|a| format!("--author={}", a)));
    } else if args.format.is_shortlog() {
        params.push("--use-mailmap".into());
    }
    if args.all {
        params.push("--all".into());
    }
    push_reference(&mut params, args.reference, args.reverse);
    params.push("--".into());

    GitCommand::new(args.repo_path, params)
        .config("diff.renameLimit", "0")
        .config("log.showSignature", "false")
}

#[derive(Debug, Clone, Default)]
pub struct FileLogArgs<'a> {
    pub repo_path: Option<&'a str>,
    /// A file, or a folder glob (`dir/*`)
    pub file: &'a str,
    pub reference: Option<&'a str>,
    pub format: LogFormat,
    pub limit: Option<usize>,
    pub skip: usize,
    pub all: bool,
    pub first_parent: bool,
    /// `--follow`; dropped with `all` or a line range
    pub renames: bool,
    pub reverse: bool,
    pub ordering: Option<&'a str>,
    pub since: Option<&'a str>,
    pub filters: &'a str,
    /// 1-based inclusive line range, traced with `-L`
    pub lines: Option<(u32, u32)>,
}

/// History of one file or folder.
pub fn log_file(args: &FileLogArgs<'_>) -> GitCommand {
    let (file, root) = split_path(args.file, args.repo_path);
    let format = match args.format {
        LogFormat::Default => format::LOG_DEFAULT,
        LogFormat::Refs => format::LOG_REFS,
        _ => format::LOG_SIMPLE,
    };
    let mut params: Vec<String> = vec!["log".into(), format!("--format={}", format)];

    params.extend(ordering(args.ordering));
    if let Some(limit) = args.limit.filter(|l| *l > 0) {
        if !args.reverse {
            params.push(format!("-n{}", limit + 1));
        }
    }
    if args.skip > 0 {
        params.push(format!("--skip={}", args.skip));
    }
    if let Some(since) = args.since {
        params.push(format!("--since={}", since));
    }
    if args.all {
        params.push("--all".into());
    }

    let renames = args.renames && !args.all && args.lines.is_none();
    params.push(if renames { "--follow" } else { "-m" }.into());
    if args.first_parent {
        params.push("--first-parent".into());
        if renames {
            params.push("-m".into());
        }
    }
    params.extend(diff_filter(args.filters));

    if args.format != LogFormat::Refs {
        match args.lines {
            None if args.format == LogFormat::Simple || is_folder_glob(&file) => {
                params.push("--name-status".into());
            }
            None => {
                params.push("--numstat".into());
                params.push("--summary".into());
            }
            Some((start, end)) => {
                params.push(format!("-L{},{}:{}", start, end, file));
            }
        }
    }

    push_reference(&mut params, args.reference, args.reverse);

    // -L takes its own path and rejects a pathspec
    if args.lines.is_none() {
        params.push("--".into());
        params.push(file);
    }

    GitCommand::new(root, params).config("log.showSignature", "false")
}

fn single_sha_log(repo_path: &str, mut params: Vec<String>) -> GitCommand {
    params.insert(0, "log".into());
    GitCommand::new(repo_path, params)
        .config("log.showSignature", "false")
        .errors(ErrorHandling::Ignore)
}

/// Sha of the most recent commit touching `file`.
pub fn log_file_recent(
    repo_path: &str,
    file: &str,
    reference: Option<&str>,
    order: Option<&str>,
    similarity: Option<u8>,
) -> GitCommand {
    let mut params = vec![find_renames(similarity), "-n1".into(), "--format=%H".into()];
    params.extend(ordering(order));
    params.extend(reference.map(str::to_string));
    params.extend(["--".into(), file.to_string()]);
    single_sha_log(repo_path, params)
}

/// Sha of the first commit, reachable from `reference`, that introduced `object_id`.
pub fn log_find_object(
    repo_path: &str,
    object_id: &str,
    reference: &str,
    order: Option<&str>,
    file: Option<&str>,
) -> GitCommand {
    let mut params = vec![
        "-n1".into(),
        "--no-renames".into(),
        "--format=%H".into(),
        format!("--find-object={}", object_id),
        reference.to_string(),
    ];
    params.extend(ordering(order));
    if let Some(file) = file {
        params.extend(["--".into(), file.to_string()]);
    }
    single_sha_log(repo_path, params)
}

/// Sha of the most recent commit.
pub fn log_recent(repo_path: &str, order: Option<&str>) -> GitCommand {
    let mut params = vec!["-n1".into(), "--format=%H".into()];
    params.extend(ordering(order));
    params.push("--".into());
    single_sha_log(repo_path, params)
}

/// Committer timestamp of the most recent commit.
pub fn log_recent_committer_date(repo_path: &str, order: Option<&str>) -> GitCommand {
    let mut params = vec!["-n1".into(), "--format=%ct".into()];
    params.extend(ordering(order));
    params.push("--".into());
    single_sha_log(repo_path, params)
}

#[derive(Debug, Clone, Default)]
pub struct SearchArgs<'a> {
    pub repo_path: &'a str,
    /// Raw search arguments, e.g. `--grep=fix` or `-S<text>`
    pub search: &'a [String],
    pub limit: Option<usize>,
    pub skip: usize,
    pub ordering: Option<&'a str>,
    /// Look up specific shas with `show` instead of walking history
    pub use_show: bool,
}

/// Commit search.
pub fn log_search(args: &SearchArgs<'_>) -> GitCommand {
    let mut params: Vec<String> = vec![
        if args.use_show { "show" } else { "log" }.into(),
        "--name-status".into(),
        format!("--format={}", format::LOG_DEFAULT),
        "--use-mailmap".into(),
    ];
    if !args.use_show {
        if let Some(limit) = args.limit.filter(|l| *l > 0) {
            params.push(format!("-n{}", limit + 1));
        }
        if args.skip > 0 {
            params.push(format!("--skip={}", args.skip));
        }
        params.extend(ordering(args.ordering));
    }
    params.extend(args.search.iter().cloned());

    let command = GitCommand::new(args.repo_path, params);
    if args.use_show {
        command
    } else {
        command.config("log.showSignature", "false")
    }
}

// ============================================================================
// show
// ============================================================================

/// `git show --textconv <ref>:./<file>`. The staged revision reads the index.
///
/// Errors always propagate so the caller can apply its fallbacks.
pub fn show(
    repo_path: Option<&str>,
    file: &str,
    reference: &str,
    encoding: Encoding,
) -> GitCommand {
    let (file, root) = split_path(file, repo_path);
    let reference = if rev::is_uncommitted_staged(reference) {
        rev::STAGED_SHORTHAND
    } else {
        reference
    };
    let object = if reference.ends_with(':') {
        format!("{}./{}", reference, file)
    } else {
        format!("{}:./{}", reference, file)
    };

    GitCommand::new(root, ["show".to_string(), "--textconv".into(), object, "--".into()])
        .config("log.showSignature", "false")
        .encoding(encoding)
        .errors(ErrorHandling::Throw)
}

/// Patch of one file in one commit, following a rename when `original` is set.
pub fn show_diff(
    repo_path: &str,
    file: &str,
    reference: &str,
    original: Option<&str>,
    similarity: Option<u8>,
) -> GitCommand {
    let mut params: Vec<String> = vec![
        "show".into(),
        find_renames(similarity),
        "--format=".into(),
        "--minimal".into(),
        "-U0".into(),
        reference.to_string(),
        "--".into(),
        file.to_string(),
    ];
    params.extend(original.filter(|o| !o.is_empty()).map(str::to_string));
    GitCommand::new(repo_path, params)
}

pub fn show_name_status(repo_path: &str, file: &str, reference: &str) -> GitCommand {
    GitCommand::new(
        repo_path,
        [
            "show",
            "--name-status",
            "--format=",
            reference,
            "--",
            file,
        ],
    )
}

// ============================================================================
// reflog / shortlog
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReflogArgs<'a> {
    pub repo_path: &'a str,
    pub all: bool,
    pub branch: Option<&'a str>,
    pub limit: Option<usize>,
    pub skip: usize,
    pub ordering: Option<&'a str>,
}

pub fn reflog(args: &ReflogArgs<'_>) -> GitCommand {
    let mut params: Vec<String> = vec![
        "log".into(),
        "--walk-reflogs".into(),
        format!("--format={}", format::REFLOG),
        "--date=iso8601".into(),
    ];
    params.extend(ordering(args.ordering));
    if args.all {
        params.push("--all".into());
    }
    if let Some(limit) = args.limit.filter(|l| *l > 0) {
        params.push(format!("-n{}", limit));
    }
    if args.skip > 0 {
        params.push(format!("--skip={}", args.skip));
    }
    params.extend(args.branch.map(str::to_string));
    params.push("--".into());

    GitCommand::new(args.repo_path, params).config("log.showSignature", "false")
}

/// `git shortlog -sne --all --no-merges HEAD`.
pub fn shortlog(repo_path: &str) -> GitCommand {
    GitCommand::new(
        repo_path,
        ["shortlog", "-sne", "--all", "--no-merges", "HEAD"],
    )
}
