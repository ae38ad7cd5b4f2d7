//! blame command - Show who last changed each line of a file

use std::path::Path;

use anyhow::{bail, Result};

use super::Session;
use crate::cli::Context;
use crate::models::GitBlame;
use crate::ui::output;

/// Print the blame of `file`, optionally at `reference` and for `lines`.
pub async fn blame(
    ctx: &Context,
    file: &Path,
    reference: Option<&str>,
    lines: Option<(u32, u32)>,
) -> Result<()> {
    let session = Session::open(ctx).await?;
    let path = ctx.absolute(file)?;

    let blame = match lines {
        Some((start, end)) => {
            session
                .service
                .blame_for_range(&path, reference, start, end)
                .await
        }
        None => session
            .service
            .blame_for_file(&path, reference)
            .await
            .map(|b| b.as_ref().clone()),
    };
    let Some(blame) = blame else {
        bail!("no blame for {}; is it tracked?", file.display());
    };

    if ctx.json {
        return output::json(&blame);
    }

    // Working tree text lines up with the blame only without a revision
    let text = match reference {
        None => tokio::fs::read_to_string(&path).await.ok(),
        Some(_) => None,
    };
    println!("{}", render(&blame, text.as_deref()));
    Ok(())
}

fn render(blame: &GitBlame, text: Option<&str>) -> String {
    let source: Vec<&str> = text.map(|t| t.lines().collect()).unwrap_or_default();
    let rows: Vec<Vec<String>> = blame
        .lines
        .iter()
        .map(|line| {
            let commit = blame.commit(&line.sha);
            let mut row = vec![
                output::format_sha(&line.sha),
                commit.map(|c| c.author.clone()).unwrap_or_default(),
                output::format_date(commit.and_then(|c| c.author_date)),
                line.line.to_string(),
            ];
            if !source.is_empty() {
                let index = usize::try_from(line.line.saturating_sub(1)).unwrap_or(usize::MAX);
                row.push(source.get(index).copied().unwrap_or_default().to_string());
            }
            row
        })
        .collect();
    output::columns(&rows)
}
