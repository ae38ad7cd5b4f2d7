//! contributors command - Commit counts per person

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::models::Contributor;
use crate::ui::output;

pub async fn contributors(ctx: &Context, stats: bool) -> Result<()> {
    let session = Session::open(ctx).await?;
    let contributors = session.service.contributors(&session.repo, stats).await;

    if ctx.json {
        return output::json(&contributors);
    }
    if contributors.is_empty() {
        output::print("No contributors", ctx.verbosity());
        return Ok(());
    }

    let rows: Vec<Vec<String>> = contributors.iter().map(row).collect();
    println!("{}", output::columns(&rows));
    Ok(())
}

fn row(contributor: &Contributor) -> Vec<String> {
    let marker = if contributor.current { "*" } else { " " };
    let mut row = vec![
        marker.to_string(),
        contributor.commits.to_string(),
        format!("{} <{}>", contributor.name, contributor.email),
    ];
    if let (Some(additions), Some(deletions)) = (contributor.additions, contributor.deletions) {
        row.push(format!(
            "+{} -{} in {} files",
            additions,
            deletions,
            contributor.files.unwrap_or(0)
        ));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_column_only_with_stats() {
        let mut contributor = Contributor {
            repo_path: "/r".to_string(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            commits: 3,
            additions: None,
            deletions: None,
            files: None,
            current: true,
        };
        assert_eq!(row(&contributor), ["*", "3", "Ann <ann@example.com>"]);

        contributor.additions = Some(10);
        contributor.deletions = Some(2);
        contributor.files = Some(4);
        assert_eq!(row(&contributor)[3], "+10 -2 in 4 files");
    }
}
