//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens a [`Session`]: configuration, a started service, the repository
//! 2. Calls one or two service operations
//! 3. Formats and displays output
//!
//! Handlers are async and run on the runtime started by [`crate::cli::run`].

mod blame;
mod branches;
mod contributors;
mod log_cmd;
mod repos;
mod stash;
mod status;
mod tags;
mod version;

pub use blame::blame;
pub use branches::branches;
pub use contributors::contributors;
pub use log_cmd::log;
pub use repos::repos;
pub use stash::stash;
pub use status::status;
pub use tags::tags;
pub use version::version;

use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::cli::args::Command;
use crate::cli::Context;
use crate::core::config::Config;
use crate::service::{GitService, ServiceSettings};
use crate::ui::output;

/// Dispatch a command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Repos { depth } => repos::repos(ctx, depth).await,
        Command::Blame {
            file,
            reference,
            lines,
        } => blame::blame(ctx, &file, reference.as_deref(), lines).await,
        Command::Log {
            file,
            reference,
            limit,
            all,
            authors,
            since,
            search,
            lines,
            incoming,
        } => {
            let args = log_cmd::LogArgs {
                file,
                reference,
                limit,
                all,
                authors,
                since,
                search,
                lines,
                incoming,
            };
            log_cmd::log(ctx, args).await
        }
        Command::Status { file } => status::status(ctx, file.as_deref()).await,
        Command::Branches { remote } => branches::branches(ctx, remote).await,
        Command::Tags => tags::tags(ctx).await,
        Command::Stash => stash::stash(ctx).await,
        Command::Contributors { stats } => contributors::contributors(ctx, stats).await,
        Command::Version => version::version(ctx).await,
    }
}

/// Merged configuration for `repo` (global only without one).
pub(crate) fn load_config(ctx: &Context, repo: Option<&str>) -> Result<Config> {
    let result = Config::load(repo.map(Path::new))?;
    for warning in &result.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            ctx.verbosity(),
        );
    }
    Ok(result.config)
}

/// A started service and the repository of the working directory.
pub(crate) struct Session {
    pub service: GitService,
    /// Repository root
    pub repo: String,
}

impl Session {
    /// Start the service and resolve the repository containing the working
    /// directory, then apply that repository's configuration.
    pub async fn open(ctx: &Context) -> Result<Self> {
        let cwd = ctx.cwd()?;
        let service = start_service(ctx).await?;

        let repo = service
            .get_repo_path(&cwd, true)
            .await?
            .ok_or_else(|| anyhow!("not a git repository (or any parent): {}", cwd))?;
        debug!("using repository {}", repo);

        let config = load_config(ctx, Some(&repo))?;
        service.update_settings(ServiceSettings::from(&config));
        Ok(Self { service, repo })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.service.shutdown();
    }
}

/// Service configured from the global configuration.
pub(crate) async fn start_service(ctx: &Context) -> Result<GitService> {
    let config = load_config(ctx, None)?;
    Ok(GitService::init(ServiceSettings::from(&config)).await?)
}
