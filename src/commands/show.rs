use anyhow::Result;

use crate::commands::{CommandReport, open_store};
use crate::shelf::browse::show_object;
use crate::shelf::config::load_config;
use crate::shelf::paths::resolve_paths;

#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub key: String,
}

pub fn run(opts: &ShowOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let store = open_store(&cfg, &paths)?;
    let mut report = CommandReport::new("show");

    report.detail(format!("key={}", opts.key));
    match show_object(store.as_ref(), &opts.key) {
        Ok(rendered) => report.data = Some(serde_json::to_value(&rendered)?),
        Err(err) => report.issue(err.to_string()),
    }

    Ok(report)
}
