//! log command - Commit history of the repository or a file
//!
//! Also prints search results and, with `--incoming`, merge and pull
//! activity from the reflog.

use std::path::PathBuf;

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::models::{GitLog, Reflog, SearchPattern};
use crate::service::{FileLogOptions, LogOptions, ReflogOptions};
use crate::ui::output;

/// Arguments of `gscope log`.
#[derive(Debug, Clone, Default)]
pub struct LogArgs {
    pub file: Option<PathBuf>,
    pub reference: Option<String>,
    pub limit: Option<usize>,
    pub all: bool,
    pub authors: Vec<String>,
    pub since: Option<String>,
    pub search: Option<String>,
    pub lines: Option<(u32, u32)>,
    pub incoming: bool,
}

pub async fn log(ctx: &Context, args: LogArgs) -> Result<()> {
    let session = Session::open(ctx).await?;
    let service = &session.service;

    if args.incoming {
        let options = ReflogOptions {
            all: args.all,
            branch: args.reference,
            limit: args.limit,
            skip: 0,
        };
        let reflog = service.incoming_activity(&session.repo, &options).await;
        return print_reflog(ctx, reflog);
    }

    let log = if let Some(query) = &args.search {
        service
            .log_for_search(&session.repo, &SearchPattern::new(query.as_str()), args.limit, 0)
            .await
    } else if let Some(file) = &args.file {
        let path = ctx.absolute(file)?;
        let options = FileLogOptions {
            reference: args.reference,
            all: args.all.then_some(true),
            limit: args.limit,
            since: args.since,
            range: args.lines,
            ..Default::default()
        };
        service
            .log_for_file(&path, options)
            .await
            .map(|log| log.as_ref().clone())
    } else {
        let options = LogOptions {
            reference: args.reference,
            all: args.all,
            limit: args.limit,
            since: args.since,
            authors: args.authors,
            ..Default::default()
        };
        service.log(&session.repo, options).await
    };

    print_log(ctx, log)
}

fn print_log(ctx: &Context, log: Option<GitLog>) -> Result<()> {
    if ctx.json {
        return output::json(&log);
    }
    let Some(log) = log else {
        output::print("No commits found", ctx.verbosity());
        return Ok(());
    };

    let rows: Vec<Vec<String>> = log
        .commits
        .iter()
        .map(|commit| {
            vec![
                output::format_sha(&commit.sha),
                output::format_date(commit.author_date),
                commit.author.clone(),
                commit.summary.clone(),
            ]
        })
        .collect();
    println!("{}", output::columns(&rows));

    if log.has_more {
        output::print(
            format!("... more commits available (showing {}; raise with -n)", log.count),
            ctx.verbosity(),
        );
    }
    Ok(())
}

fn print_reflog(ctx: &Context, reflog: Option<Reflog>) -> Result<()> {
    if ctx.json {
        return output::json(&reflog);
    }
    let Some(reflog) = reflog.filter(|r| !r.records.is_empty()) else {
        output::print("No incoming activity", ctx.verbosity());
        return Ok(());
    };

    let rows: Vec<Vec<String>> = reflog
        .records
        .iter()
        .map(|record| {
            vec![
                output::format_sha(&record.sha),
                record.date.clone(),
                record.selector.clone(),
                format!("{}{}", record.command, record.command_args),
                record.details.trim().to_string(),
            ]
        })
        .collect();
    println!("{}", output::columns(&rows));
    Ok(())
}
