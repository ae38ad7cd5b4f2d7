//! tags command - Tags with their commits

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::ui::output;

pub async fn tags(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let tags = session.service.tags(&session.repo).await;

    if ctx.json {
        return output::json(&tags);
    }
    if tags.is_empty() {
        output::print("No tags", ctx.verbosity());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = tags
        .iter()
        .map(|tag| {
            let commit = tag.commit_sha.as_deref().unwrap_or(&tag.sha);
            vec![
                tag.name.clone(),
                output::format_sha(commit),
                output::format_date(tag.date),
                tag.message.clone(),
            ]
        })
        .collect();
    println!("{}", output::columns(&rows));
    Ok(())
}
