//! stash command - Stash entries and the files they touch

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::ui::output;

pub async fn stash(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx).await?;
    let stash = session.service.stash(&session.repo).await;

    if ctx.json {
        return output::json(&stash);
    }
    let Some(stash) = stash.filter(|s| !s.entries.is_empty()) else {
        output::print("No stash entries", ctx.verbosity());
        return Ok(());
    };

    let rows: Vec<Vec<String>> = stash
        .entries
        .iter()
        .map(|entry| {
            vec![
                entry.stash_name.clone(),
                output::format_date(entry.date),
                format!("{} files", entry.files.len()),
                entry.message.lines().next().unwrap_or_default().to_string(),
            ]
        })
        .collect();
    println!("{}", output::columns(&rows));
    Ok(())
}
