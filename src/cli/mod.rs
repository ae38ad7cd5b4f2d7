//! cli
//!
//! Command-line interface for gitscope.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Start a [`GitService`](crate::service::GitService) and dispatch to a handler
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers call the service and format its results
//! through [`crate::ui::output`]; they never spawn git themselves.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::paths;
use crate::ui::output::Verbosity;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// JSON output.
    pub json: bool,
}

impl Context {
    /// Absolute working directory in normalized form.
    pub fn cwd(&self) -> Result<String> {
        let cwd = match &self.cwd {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => std::env::current_dir()
                .context("cannot read the current directory")?
                .join(path),
            None => std::env::current_dir().context("cannot read the current directory")?,
        };
        Ok(paths::normalize(&cwd))
    }

    /// Resolve `path` against the working directory.
    pub fn absolute(&self, path: &std::path::Path) -> Result<String> {
        Ok(paths::join(&self.cwd()?, &paths::normalize(path)))
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Log filter for the flags; `RUST_LOG` wins when set.
pub fn log_filter(debug: bool, quiet: bool) -> EnvFilter {
    let default = if debug {
        "gitscope=debug"
    } else if quiet {
        "error"
    } else {
        "gitscope=warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_tracing(debug: bool, quiet: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug, quiet))
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init();
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        json: cli.json,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(commands::dispatch(cli.command, &ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_cwd_is_resolved() {
        let ctx = Context {
            cwd: Some(PathBuf::from("sub")),
            ..Default::default()
        };
        let cwd = ctx.cwd().unwrap();
        assert!(cwd.ends_with("/sub"));
        assert!(std::path::Path::new(&cwd).is_absolute());
    }

    #[test]
    fn absolute_paths_pass_through() {
        let ctx = Context {
            cwd: Some(PathBuf::from("/work/repo")),
            ..Default::default()
        };
        assert_eq!(
            ctx.absolute(std::path::Path::new("src/lib.rs")).unwrap(),
            "/work/repo/src/lib.rs"
        );
        assert_eq!(
            ctx.absolute(std::path::Path::new("/other/x.rs")).unwrap(),
            "/other/x.rs"
        );
    }

    #[test]
    fn verbosity_follows_flags() {
        let ctx = Context {
            quiet: true,
            debug: true,
            ..Default::default()
        };
        assert_eq!(ctx.verbosity(), Verbosity::Quiet);
    }
}
