use anyhow::Result;
use chrono::{Local, NaiveDate};

use crate::commands::{CommandReport, open_store};
use crate::shelf::browse::{BrowseScope, list_browsable};
use crate::shelf::config::load_config;
use crate::shelf::paths::resolve_paths;

#[derive(Debug, Clone)]
pub struct BrowseOptions {
    pub date: Option<NaiveDate>,
    pub scope: BrowseScope,
}

pub fn run(opts: &BrowseOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let store = open_store(&cfg, &paths)?;
    let mut report = CommandReport::new("browse");

    let date = opts.date.unwrap_or_else(|| Local::now().date_naive());
    let listing = match list_browsable(store.as_ref(), date, opts.scope) {
        Ok(listing) => listing,
        Err(err) => {
            report.issue(format!("listing failed: {err}"));
            return Ok(report);
        }
    };

    report.detail(format!("store={}", store.describe()));
    report.detail(format!("prefix={}", listing.prefix));
    if listing.keys.is_empty() {
        report.detail("no .json, .jsonl or .log objects under prefix");
    }
    for key in &listing.keys {
        report.detail(format!("key={key}"));
    }
    report.data = Some(serde_json::to_value(&listing)?);

    Ok(report)
}
