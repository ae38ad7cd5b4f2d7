//! version command - gscope and git versions

use anyhow::Result;
use serde::Serialize;

use super::start_service;
use crate::cli::Context;
use crate::ui::output;

#[derive(Debug, Serialize)]
struct Versions {
    gscope: &'static str,
    git: String,
    git_path: String,
}

pub async fn version(ctx: &Context) -> Result<()> {
    let service = start_service(ctx).await?;
    let versions = Versions {
        gscope: env!("CARGO_PKG_VERSION"),
        git: service.git().version().to_string(),
        git_path: service.git().path().to_string(),
    };
    service.shutdown();

    if ctx.json {
        return output::json(&versions);
    }
    println!("gscope {}", versions.gscope);
    println!("git {} ({})", versions.git, versions.git_path);
    Ok(())
}
