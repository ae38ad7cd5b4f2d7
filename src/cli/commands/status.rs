//! status command - Working tree status of the repository or one file

use std::path::Path;

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::models::RepoStatus;
use crate::ui::output;

pub async fn status(ctx: &Context, file: Option<&Path>) -> Result<()> {
    let session = Session::open(ctx).await?;

    if let Some(file) = file {
        let path = ctx.absolute(file)?;
        let status = session.service.status_for_file(&path).await;
        if ctx.json {
            return output::json(&status);
        }
        match status {
            Some(status) => println!("{}", output::format_status(&status)),
            None => output::print(format!("{}: unmodified", file.display()), ctx.verbosity()),
        }
        return Ok(());
    }

    let status = session.service.status(&session.repo).await;
    if ctx.json {
        return output::json(&status);
    }
    match status {
        Some(status) => println!("{}", render(&status)),
        None => output::print("No status available", ctx.verbosity()),
    }
    Ok(())
}

fn render(status: &RepoStatus) -> String {
    let mut lines = Vec::new();
    let mut header = match &status.branch {
        Some(branch) => format!("On branch {}", branch),
        None => format!(
            "HEAD detached at {}",
            status.sha.as_deref().map(output::format_sha).unwrap_or_default()
        ),
    };
    if let Some(upstream) = &status.upstream {
        header.push_str(&format!(" [{}", upstream));
        if status.ahead > 0 {
            header.push_str(&format!(" ahead {}", status.ahead));
        }
        if status.behind > 0 {
            header.push_str(&format!(" behind {}", status.behind));
        }
        header.push(']');
    }
    lines.push(header);

    if status.files.is_empty() {
        lines.push("nothing to commit, working tree clean".to_string());
    }
    lines.extend(status.files.iter().map(output::format_status));
    lines.join("\n")
}
