//! git::runner
//!
//! Process spawning behind a trait seam.
//!
//! # Design
//!
//! [`ProcessRunner`] is the only place an OS process is started. The
//! production implementation, [`TokioProcessRunner`], uses
//! `tokio::process::Command`; tests substitute
//! [`MockRunner`](super::mock::MockRunner) to count and script invocations.
//!
//! A runner call spawns exactly one process, writes the optional stdin
//! payload to completion while stdout is drained, and turns a nonzero exit
//! into a [`RunError`] carrying stdout, stderr and the exit code. It never
//! retries.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

use super::errors::RunError;

/// How stdout is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Decode as UTF-8 (lossy)
    #[default]
    Utf8,
    /// Raw bytes, for binary file contents
    Buffer,
}

/// Captured stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Text(String),
    Bytes(Vec<u8>),
}

impl Output {
    pub fn decode(bytes: Vec<u8>, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Utf8 => Output::Text(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            }),
            Encoding::Buffer => Output::Bytes(bytes),
        }
    }

    /// Text view; bytes are decoded lossily.
    pub fn into_text(self) -> String {
        match self {
            Output::Text(text) => text,
            Output::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Output::Text(text) => text.into_bytes(),
            Output::Bytes(bytes) => bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Output::Text(text) => text.is_empty(),
            Output::Bytes(bytes) => bytes.is_empty(),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Output,
    pub stderr: String,
}

/// Per-call process options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
    pub encoding: Encoding,
}

/// Spawns a process and collects its output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        executable: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<RunOutput, RunError>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        executable: &str,
        args: &[String],
        options: &RunOptions,
    ) -> Result<RunOutput, RunError> {
        let command_line = format!("{} {}", executable, args.join(" "));

        let mut command = Command::new(executable);
        if !options.cwd.as_os_str().is_empty() {
            command.current_dir(&options.cwd);
        }
        command
            .args(args)
            .envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| RunError::spawn(command_line.clone(), &e))?;

        let writer = {
            let sink = child.stdin.take();
            let input = options.stdin.clone();
            async move {
                if let (Some(mut sink), Some(input)) = (sink, input) {
                    sink.write_all(&input).await?;
                    sink.shutdown().await?;
                }
                Ok::<(), std::io::Error>(())
            }
        };

        let (written, output) = tokio::join!(writer, child.wait_with_output());

        if let Err(err) = written {
            // git may exit before consuming all of stdin (e.g. on a bad revision)
            trace!(command = %command_line, error = %err, "stdin write ended early");
        }

        let output = output.map_err(|e| RunError::spawn(command_line.clone(), &e))?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(RunError::exited(
                command_line,
                output.status.code(),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr,
            ));
        }

        Ok(RunOutput {
            stdout: Output::decode(output.stdout, options.encoding),
            stderr,
        })
    }
}
