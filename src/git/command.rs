//! git::command
//!
//! The immutable description of one git invocation.
//!
//! Builders produce a [`GitCommand`]; the executor turns it into a process
//! run. The command's [`signature`](GitCommand::signature) is its identity
//! for deduplication: correlation key, working directory and joined
//! arguments. Two commands that differ in any of those never share a
//! process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::runner::Encoding;

/// What to do when git exits unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Benign warnings become empty output; everything else propagates.
    #[default]
    Default,
    /// Any failure becomes empty output.
    Ignore,
    /// Every failure propagates, warnings included.
    Throw,
}

/// One git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    pub cwd: PathBuf,
    pub args: Vec<String>,
    /// `-c key=value` pairs applied before the subcommand
    pub configs: Vec<(String, String)>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
    pub encoding: Encoding,
    pub errors: ErrorHandling,
    /// Keeps otherwise identical commands apart, e.g. blames of different buffer contents
    pub correlation_key: Option<String>,
    /// How long this caller waits; the process itself is never killed
    pub timeout: Option<Duration>,
}

impl GitCommand {
    pub fn new<I, S>(cwd: impl AsRef<Path>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            args: args.into_iter().map(Into::into).collect(),
            configs: Vec::new(),
            env: Vec::new(),
            stdin: None,
            encoding: Encoding::Utf8,
            errors: ErrorHandling::Default,
            correlation_key: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn config(mut self, key: &str, value: &str) -> Self {
        self.configs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn errors(mut self, errors: ErrorHandling) -> Self {
        self.errors = errors;
        self
    }

    pub fn correlation_key(mut self, key: impl Into<String>) -> Self {
        self.correlation_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// The subcommand, e.g. `blame`.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Combined argument length, checked against the command-line limit.
    pub fn args_len(&self) -> usize {
        self.args.iter().map(|a| a.len() + 1).sum()
    }

    /// Full argument vector: global configs, per-command configs, then args.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2 * (self.configs.len() + 3));
        let global = [("core.quotepath", "false"), ("color.ui", "false")];
        let platform: &[(&str, &str)] = if cfg!(windows) {
            &[("core.longpaths", "true")]
        } else {
            &[]
        };

        for (key, value) in platform.iter().chain(global.iter()) {
            argv.push("-c".to_string());
            argv.push(format!("{}={}", key, value));
        }
        for (key, value) in &self.configs {
            argv.push("-c".to_string());
            argv.push(format!("{}={}", key, value));
        }
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Identity used for sharing in-flight executions.
    ///
    /// Raw-byte reads are kept apart from text reads of the same object.
    pub fn signature(&self) -> String {
        format!(
            "{}:[{}] git {}{}",
            self.correlation_key.as_deref().unwrap_or_default(),
            self.cwd.display(),
            self.argv().join(" "),
            if self.encoding == Encoding::Buffer { " #buffer" } else { "" }
        )
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] git {}", self.cwd.display(), self.args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_includes_key_cwd_and_args() {
        let cmd = GitCommand::new("/repo", ["blame", "--root", "--", "a.rs"]);
        assert!(cmd.signature().starts_with(":[/repo] git "));
        assert!(cmd.signature().ends_with("-c color.ui=false blame --root -- a.rs"));

        let keyed = cmd.clone().correlation_key(":blame:abc");
        assert!(keyed.signature().starts_with(":blame:abc:[/repo] git "));
        assert_ne!(cmd.signature(), keyed.signature());
    }

    #[test]
    fn timeout_is_not_part_of_the_signature() {
        let cmd = GitCommand::new("/repo", ["log"]);
        let timed = cmd.clone().timeout(Some(Duration::from_millis(50)));
        assert_eq!(cmd.signature(), timed.signature());
        assert_eq!(cmd.clone().timeout(Some(Duration::ZERO)).timeout, None);
    }

    #[test]
    fn cwd_changes_signature() {
        let a = GitCommand::new("/a", ["status"]);
        let b = GitCommand::new("/b", ["status"]);
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn argv_prefixes_configs() {
        let cmd = GitCommand::new("/repo", ["status"]).config("color.status", "false");
        let argv = cmd.argv();
        let tail: Vec<&str> = argv.iter().rev().take(7).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            [
                "-c",
                "core.quotepath=false",
                "-c",
                "color.ui=false",
                "-c",
                "color.status=false",
                "status"
            ]
        );
        assert_ne!(
            cmd.signature(),
            GitCommand::new("/repo", ["status"]).signature()
        );
    }

    #[test]
    fn builders_chain() {
        let cmd = GitCommand::new("/repo", ["diff"])
            .arg("--")
            .config("color.diff", "false")
            .errors(ErrorHandling::Ignore)
            .stdin("x");
        assert_eq!(cmd.subcommand(), Some("diff"));
        assert!(cmd.has_arg("--"));
        assert_eq!(cmd.configs, vec![("color.diff".to_string(), "false".to_string())]);
        assert_eq!(cmd.errors, ErrorHandling::Ignore);
        assert_eq!(cmd.stdin.as_deref(), Some(&b"x"[..]));
        assert_eq!(cmd.args_len(), "diff".len() + 1 + 1 + 1);
    }
}
