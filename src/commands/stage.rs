use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::commands::ingest::staged_files;
use crate::shelf::decode::is_upload_candidate;
use crate::shelf::paths::resolve_paths;

#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    pub files: Vec<PathBuf>,
}

pub fn run(opts: &StageOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("stage");
    let staging = &paths.staging_dir;
    fs::create_dir_all(staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    report.detail(format!("staging_dir={}", staging.display()));

    for file in &opts.files {
        if !is_upload_candidate(file) {
            report.issue(format!(
                "file={} rejected: only .json and .jsonl uploads are accepted",
                file.display()
            ));
            continue;
        }
        let Some(name) = file.file_name() else {
            report.issue(format!("file={} has no file name", file.display()));
            continue;
        };
        let target = staging.join(name);
        match fs::copy(file, &target) {
            Ok(bytes) => report.detail(format!("staged={} bytes={bytes}", target.display())),
            Err(err) => report.issue(format!("file={} copy failed: {err}", file.display())),
        }
    }

    for path in staged_files(staging)? {
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            report.detail(format!("staged_file={name}"));
        }
    }

    Ok(report)
}
