use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::shelf::config::{StoreBackend, load_config, resolve_config_path};
use crate::shelf::lock::{LockState, probe};
use crate::shelf::paths::resolve_paths;

include!(concat!(env!("OUT_DIR"), "/jobshelf_env_allowlist.rs"));

/// Variables shared with the S3 tooling that preceded this CLI.
const COMPAT_ENV_KEYS: &[&str] = &["BUCKET_NAME", "ENDPOINT_URL", "AWS_REGION"];

fn env_is_set(key: &str) -> bool {
    env::var_os(key).is_some_and(|v| !v.is_empty())
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("staging_dir={}", paths.staging_dir.display()));
    report.detail(format!("log_file={}", paths.log_file.display()));

    let config_path = resolve_config_path(&paths);
    report.detail(format!(
        "config_file={} exists={}",
        config_path.display(),
        config_path.exists()
    ));

    match load_config(&paths) {
        Ok(cfg) => {
            report.detail(format!("source_tag={}", cfg.ingest.source_tag));
            let backend = cfg.store.backend_kind()?;
            report.detail(format!("store.backend={}", backend.as_str()));
            match backend {
                StoreBackend::Fs => {
                    let dir = cfg
                        .store
                        .dir
                        .clone()
                        .unwrap_or_else(|| paths.store_dir.display().to_string());
                    report.detail(format!("store.dir={dir}"));
                }
                StoreBackend::S3 => {
                    report.detail(format!("store.bucket={}", cfg.store.bucket));
                    report.detail(format!(
                        "store.endpoint_url={}",
                        cfg.store.endpoint_url.as_deref().unwrap_or("aws-default")
                    ));
                    report.detail(format!("store.region={}", cfg.store.region));
                }
            }
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    for key in GENERATED_JOBSHELF_ENV_ALLOWLIST.iter().chain(COMPAT_ENV_KEYS) {
        if env_is_set(key) {
            report.detail(format!("env.{key}=set"));
        }
    }

    match probe(&paths.lock_file())? {
        LockState::Absent | LockState::Free => report.detail("ingest.lock=free"),
        LockState::Held(Some(holder)) => {
            report.detail(format!(
                "ingest.lock=held pid={} started_at={}",
                holder.pid, holder.started_at_epoch_secs
            ));
            if holder.build_uuid != env!("BUILD_UUID") {
                report.detail(format!("ingest.lock.build={} (different build)", holder.build_uuid));
            }
        }
        LockState::Held(None) => report.detail("ingest.lock=held holder=unknown"),
    }

    Ok(report)
}
