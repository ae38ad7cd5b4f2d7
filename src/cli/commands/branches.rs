//! branches command - Local (and remote) branches with tracking state

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::ui::output;

pub async fn branches(ctx: &Context, remote: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let branches: Vec<_> = session
        .service
        .branches(&session.repo)
        .await
        .into_iter()
        .filter(|b| remote || !b.remote)
        .collect();

    if ctx.json {
        return output::json(&branches);
    }
    if branches.is_empty() {
        output::print("No branches", ctx.verbosity());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = branches
        .iter()
        .map(|branch| {
            vec![
                output::format_branch(branch),
                branch.sha.as_deref().map(output::format_sha).unwrap_or_default(),
                output::format_date(branch.date),
            ]
        })
        .collect();
    println!("{}", output::columns(&rows));
    Ok(())
}
