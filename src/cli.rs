use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::browse::{self, BrowseOptions};
use crate::commands::ingest::{self, IngestOptions};
use crate::commands::show::{self, ShowOptions};
use crate::commands::stage::{self, StageOptions};
use crate::commands::{Ambient, CommandReport, status};
use crate::shelf::browse::BrowseScope;

#[derive(Debug, Parser)]
#[command(
    name = "jobshelf",
    version,
    about = "Merge job-offer feeds into date-partitioned, deduplicated JSONL storage"
)]
pub struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    /// Echo info-level ingestion events to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge offer files into the store.
    Ingest {
        files: Vec<PathBuf>,
        /// Also ingest every upload waiting in the staging directory.
        #[arg(long)]
        staged: bool,
        /// Delete FILES after they ingest without partition failures.
        #[arg(long)]
        remove_processed: bool,
        /// Tag used in object names, e.g. `justjoinit`.
        #[arg(long)]
        source_tag: Option<String>,
    },
    /// Copy .json/.jsonl uploads into the staging directory.
    Stage {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List stored objects for a date.
    Browse {
        /// YYYY-MM-DD; defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value = "day")]
        scope: BrowseScope,
    },
    /// Print one stored object.
    Show { key: String },
    /// Show resolved paths, store settings and lock state.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for line in &report.details {
        println!("  {line}");
    }
    for line in &report.issues {
        println!("  issue: {line}");
    }
    if let Some(data) = &report.data {
        match data.get("kind").and_then(|k| k.as_str()) {
            Some("text") => {
                if let Some(text) = data.get("content").and_then(|c| c.as_str()) {
                    print!("{text}");
                    if !text.ends_with('\n') {
                        println!();
                    }
                }
            }
            Some(_) => {
                let content = data.get("content").unwrap_or(data);
                println!("{}", serde_json::to_string_pretty(content)?);
            }
            // Listings and totals are already in the details.
            None => {}
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let ambient = Ambient {
        verbose: cli.verbose,
    };

    let report = match cli.command {
        Command::Ingest {
            files,
            staged,
            remove_processed,
            source_tag,
        } => ingest::run(
            &IngestOptions {
                files,
                staged,
                remove_processed,
                source_tag,
            },
            ambient,
        )?,
        Command::Stage { files } => stage::run(&StageOptions { files })?,
        Command::Browse { date, scope } => browse::run(&BrowseOptions { date, scope })?,
        Command::Show { key } => show::run(&ShowOptions { key })?,
        Command::Status => status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
