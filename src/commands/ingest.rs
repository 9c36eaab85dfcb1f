use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::{Ambient, CommandReport, event_sink, open_store};
use crate::shelf::config::{load_config, validate_source_tag};
use crate::shelf::decode::{decode_file, is_upload_candidate};
use crate::shelf::events::{EventSink, IngestEvent};
use crate::shelf::ingest::{IngestReport, PartitionStatus, ingest};
use crate::shelf::lock::IngestLock;
use crate::shelf::paths::resolve_paths;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub files: Vec<PathBuf>,
    pub staged: bool,
    pub remove_processed: bool,
    pub source_tag: Option<String>,
}

struct Input {
    path: PathBuf,
    removable: bool,
}

pub fn staged_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_upload_candidate(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn status_label(status: &PartitionStatus) -> String {
    match status {
        PartitionStatus::Written => "written".to_string(),
        PartitionStatus::Unchanged => "unchanged".to_string(),
        PartitionStatus::Failed { stage, .. } => format!("failed-{stage:?}").to_ascii_lowercase(),
    }
}

fn summary_line(prefix: &str, out: &IngestReport) -> String {
    format!(
        "{prefix} observed={} accepted={} duplicates={} rejected={} failed={}",
        out.total_observed,
        out.total_accepted,
        out.total_duplicates,
        out.total_rejected,
        out.total_failed
    )
}

pub fn run(opts: &IngestOptions, ambient: Ambient) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("ingest");

    let source_tag = opts
        .source_tag
        .clone()
        .unwrap_or_else(|| cfg.ingest.source_tag.clone());
    validate_source_tag(&source_tag)?;

    let mut inputs: Vec<Input> = opts
        .files
        .iter()
        .map(|path| Input {
            path: path.clone(),
            removable: opts.remove_processed,
        })
        .collect();
    if opts.staged {
        report.detail(format!("staging_dir={}", paths.staging_dir.display()));
        inputs.extend(
            staged_files(&paths.staging_dir)?
                .into_iter()
                .map(|path| Input {
                    path,
                    removable: true,
                }),
        );
    }
    if inputs.is_empty() {
        report.issue("no input files: pass FILES or --staged");
        return Ok(report);
    }

    let lock = IngestLock::acquire(&paths.lock_file())?;
    let store = open_store(&cfg, &paths)?;
    let sink = event_sink(&paths, ambient);

    report.detail(format!("lock_file={}", lock.path().display()));
    report.detail(format!("store={}", store.describe()));
    report.detail(format!("source_tag={source_tag}"));
    report.detail(format!("log_file={}", paths.log_file.display()));

    let mut totals = IngestReport::default();
    for input in inputs {
        let name = input.path.display().to_string();
        let bytes = match fs::read(&input.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                report.issue(format!("file={name} unreadable: {err}"));
                continue;
            }
        };
        let decoded = match decode_file(&input.path, &bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                sink.emit(&IngestEvent::error(
                    "upload-decode-failed",
                    None,
                    format!("{name}: {err}"),
                ));
                report.issue(format!("file={name} skipped: {err}"));
                continue;
            }
        };
        if !decoded.skipped_lines.is_empty() {
            let lines = decoded
                .skipped_lines
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            sink.emit(&IngestEvent::warn(
                "upload-line-skipped",
                None,
                format!("{name}: invalid JSON on line(s) {lines}"),
            ));
            report.detail(format!("file={name} skipped_lines={lines}"));
        }

        let file_report = ingest(store.as_ref(), &sink, &source_tag, decoded.records);
        report.detail(summary_line(&format!("file={name}"), &file_report));
        for (key, out) in file_report.failed_partitions() {
            if let PartitionStatus::Failed { reason, .. } = &out.status {
                report.issue(format!(
                    "file={name} partition={key} key={} {}: {reason}",
                    out.storage_key,
                    status_label(&out.status)
                ));
            }
        }

        if input.removable {
            if file_report.has_failures() {
                report.detail(format!("file={name} kept for retry"));
            } else {
                match fs::remove_file(&input.path) {
                    Ok(()) => report.detail(format!("file={name} removed")),
                    Err(err) => report.issue(format!("file={name} remove failed: {err}")),
                }
            }
        }
        totals.absorb(file_report);
    }
    drop(lock);

    for (key, out) in &totals.partitions {
        report.detail(format!(
            "partition={key} key={} accepted={} duplicates={} malformed_stored_lines={} status={}",
            out.storage_key,
            out.accepted,
            out.duplicates,
            out.malformed_stored_lines,
            status_label(&out.status)
        ));
    }
    report.detail(summary_line("total", &totals));
    report.data = Some(serde_json::to_value(&totals)?);

    Ok(report)
}
