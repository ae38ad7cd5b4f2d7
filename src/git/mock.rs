//! git::mock
//!
//! Scripted process runner for deterministic testing.
//!
//! # Design
//!
//! Responses are matched by argument tokens: a response registered for
//! `["diff", "abc^"]` answers any invocation whose argument list contains
//! both tokens. Responses are tried in registration order; a response
//! registered with [`MockRunner::respond_once`] is consumed by its first
//! match. Unmatched invocations succeed with empty output.
//!
//! Every invocation is recorded so tests can assert how many processes a
//! scenario spawned.
//!
//! # Example
//!
//! ```
//! use gitscope::git::mock::MockRunner;
//! use gitscope::git::runner::{ProcessRunner, RunOptions};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let runner = MockRunner::new();
//! runner.respond(&["symbolic-ref"], "main\n");
//!
//! let args = vec!["symbolic-ref".to_string(), "--short".to_string(), "HEAD".to_string()];
//! let out = runner.run("git", &args, &RunOptions::default()).await.unwrap();
//! assert_eq!(out.stdout.into_text(), "main\n");
//! assert_eq!(runner.count(&["symbolic-ref"]), 1);
//! # });
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::errors::RunError;
use super::runner::{Output, ProcessRunner, RunOptions, RunOutput};

/// Mock runner for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    inner: Arc<Mutex<MockRunnerInner>>,
}

#[derive(Debug, Default)]
struct MockRunnerInner {
    responses: Vec<MockResponse>,
    invocations: Vec<Invocation>,
    delay: Option<Duration>,
}

#[derive(Debug, Clone)]
struct MockResponse {
    tokens: Vec<String>,
    result: MockResult,
    once: bool,
}

#[derive(Debug, Clone)]
enum MockResult {
    Stdout(String),
    Failure { exit_code: i32, stderr: String, stdout: String },
    Cancelled,
}

/// Recorded invocation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub executable: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

impl Invocation {
    pub fn has(&self, token: &str) -> bool {
        self.args.iter().any(|a| a == token)
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, tokens: &[&str], result: MockResult, once: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.responses.push(MockResponse {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            result,
            once,
        });
    }

    /// Answer matching invocations with `stdout`.
    pub fn respond(&self, tokens: &[&str], stdout: &str) {
        self.push(tokens, MockResult::Stdout(stdout.to_string()), false);
    }

    /// Answer the next matching invocation with `stdout`.
    pub fn respond_once(&self, tokens: &[&str], stdout: &str) {
        self.push(tokens, MockResult::Stdout(stdout.to_string()), true);
    }

    /// Fail matching invocations with `stderr` and exit code 128.
    pub fn fail(&self, tokens: &[&str], stderr: &str) {
        self.fail_with(tokens, 128, stderr, "");
    }

    /// Fail the next matching invocation.
    pub fn fail_once(&self, tokens: &[&str], stderr: &str) {
        self.push(
            tokens,
            MockResult::Failure {
                exit_code: 128,
                stderr: stderr.to_string(),
                stdout: String::new(),
            },
            true,
        );
    }

    pub fn fail_with(&self, tokens: &[&str], exit_code: i32, stderr: &str, stdout: &str) {
        self.push(
            tokens,
            MockResult::Failure {
                exit_code,
                stderr: stderr.to_string(),
                stdout: stdout.to_string(),
            },
            false,
        );
    }

    /// Report matching invocations as torn down before finishing.
    pub fn cancel(&self, tokens: &[&str]) {
        self.push(tokens, MockResult::Cancelled, false);
    }

    /// Delay every response, so concurrent callers overlap.
    pub fn set_delay(&self, delay: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.delay = Some(delay);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.invocations.clone()
    }

    /// Number of invocations carrying every token.
    pub fn count(&self, tokens: &[&str]) -> usize {
        self.invocations()
            .iter()
            .filter(|inv| tokens.iter().all(|t| inv.has(t)))
            .count()
    }

    pub fn clear_invocations(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.invocations.clear();
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(
        &self,
        executable: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<RunOutput, RunError> {
        let (result, delay) = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.invocations.push(Invocation {
                executable: executable.to_string(),
                args: args.to_vec(),
                cwd: options.cwd.clone(),
                env: options.env.clone(),
                stdin: options.stdin.clone(),
            });

            let found = inner
                .responses
                .iter()
                .position(|r| r.tokens.iter().all(|t| args.iter().any(|a| a == t)));

            let result = match found {
                Some(idx) if inner.responses[idx].once => Some(inner.responses.remove(idx).result),
                Some(idx) => Some(inner.responses[idx].result.clone()),
                None => None,
            };
            (result, inner.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let command = format!("{} {}", executable, args.join(" "));
        match result {
            Some(MockResult::Failure {
                exit_code,
                stderr,
                stdout,
            }) => Err(RunError::exited(command, Some(exit_code), stdout, stderr)),
            Some(MockResult::Cancelled) => Err(RunError::cancelled(command)),
            Some(MockResult::Stdout(stdout)) => Ok(RunOutput {
                stdout: Output::decode(stdout.into_bytes(), options.encoding),
                stderr: String::new(),
            }),
            None => Ok(RunOutput {
                stdout: Output::decode(Vec::new(), options.encoding),
                stderr: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn once_responses_are_consumed() {
        let runner = MockRunner::new();
        runner.respond_once(&["log"], "first");
        runner.respond(&["log"], "rest");

        let opts = RunOptions::default();
        let a = runner.run("git", &args(&["log"]), &opts).await.unwrap();
        let b = runner.run("git", &args(&["log"]), &opts).await.unwrap();
        assert_eq!(a.stdout.into_text(), "first");
        assert_eq!(b.stdout.into_text(), "rest");
    }

    #[tokio::test]
    async fn failures_carry_exit_code() {
        let runner = MockRunner::new();
        runner.fail(&["diff"], "fatal: bad revision 'x^'");

        let err = runner
            .run("git", &args(&["diff", "x^"]), &RunOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code, Some(128));
        assert_eq!(runner.count(&["diff"]), 1);
    }

    #[tokio::test]
    async fn unmatched_is_empty_success() {
        let runner = MockRunner::new();
        let out = runner
            .run("git", &args(&["status"]), &RunOptions::default())
            .await
            .unwrap();
        assert!(out.stdout.is_empty());
    }
}
