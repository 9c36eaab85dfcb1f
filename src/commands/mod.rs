pub mod browse;
pub mod ingest;
pub mod show;
pub mod stage;
pub mod status;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::shelf::config::{ShelfConfig, StoreBackend};
use crate::shelf::events::{AuditLogSink, EventLevel, StderrSink, TeeSink};
use crate::shelf::paths::ShelfPaths;
use crate::store::ObjectStore;
use crate::store::fs::FsStore;
use crate::store::s3::{S3Settings, S3Store};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Options shared by every command that touches the store or emits events.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ambient {
    pub verbose: bool,
}

pub fn open_store(cfg: &ShelfConfig, paths: &ShelfPaths) -> Result<Box<dyn ObjectStore>> {
    match cfg.store.backend_kind()? {
        StoreBackend::Fs => {
            let root = cfg
                .store
                .dir
                .as_deref()
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| paths.store_dir.clone());
            Ok(Box::new(FsStore::new(root)))
        }
        StoreBackend::S3 => {
            let store = S3Store::connect(&S3Settings {
                bucket: cfg.store.bucket.clone(),
                endpoint_url: cfg.store.endpoint_url.clone(),
                region: cfg.store.region.clone(),
                force_path_style: cfg.store.force_path_style,
            })?;
            Ok(Box::new(store))
        }
    }
}

/// Audit log file plus stderr, the latter limited to warnings unless verbose.
pub fn event_sink(paths: &ShelfPaths, ambient: Ambient) -> TeeSink {
    let min_level = if ambient.verbose {
        EventLevel::Info
    } else {
        EventLevel::Warn
    };
    TeeSink::new()
        .with(AuditLogSink::new(&paths.log_file))
        .with(StderrSink::new(min_level))
}
