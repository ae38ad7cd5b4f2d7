//! repos command - List repositories below the working directory

use anyhow::Result;
use serde::Serialize;

use super::{load_config, start_service};
use crate::cli::Context;
use crate::service::ServiceSettings;
use crate::ui::output;

#[derive(Debug, Serialize)]
struct RepoRow {
    name: String,
    path: String,
    branch: Option<String>,
}

/// Discover repositories to `depth` levels and print each with its branch.
pub async fn repos(ctx: &Context, depth: Option<usize>) -> Result<()> {
    let cwd = ctx.cwd()?;
    let service = start_service(ctx).await?;
    if let Some(depth) = depth {
        let config = load_config(ctx, None)?;
        service.update_settings(ServiceSettings {
            search_depth: depth,
            ..ServiceSettings::from(&config)
        });
    }

    let found = service.discover(&cwd).await?;
    let mut rows = Vec::with_capacity(found.len());
    for repository in &found {
        let branch = service.branch(repository.path()).await;
        rows.push(RepoRow {
            name: repository.name().to_string(),
            path: repository.path().to_string(),
            branch: branch.map(|b| b.name),
        });
    }
    service.shutdown();

    if ctx.json {
        return output::json(&rows);
    }
    if rows.is_empty() {
        output::print(format!("No repositories found in {}", cwd), ctx.verbosity());
        return Ok(());
    }

    let table: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| vec![row.name, row.branch.unwrap_or_default(), row.path])
        .collect();
    println!("{}", output::columns(&table));
    Ok(())
}
