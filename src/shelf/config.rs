use crate::shelf::paths::ShelfPaths;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SOURCE_TAG: &str = "justjoinit";
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Fs,
    S3,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Fs => "fs",
            StoreBackend::S3 => "s3",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `auto`, `fs` or `s3`. `auto` picks `s3` when a bucket is configured.
    pub backend: String,
    pub dir: Option<String>,
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub region: String,
    pub force_path_style: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            dir: None,
            bucket: String::new(),
            endpoint_url: None,
            region: DEFAULT_REGION.to_string(),
            force_path_style: false,
        }
    }
}

impl StoreConfig {
    pub fn backend_kind(&self) -> Result<StoreBackend> {
        match self.backend.trim().to_ascii_lowercase().as_str() {
            "fs" | "local" => Ok(StoreBackend::Fs),
            "s3" => Ok(StoreBackend::S3),
            "auto" | "" if self.bucket.trim().is_empty() => Ok(StoreBackend::Fs),
            "auto" | "" => Ok(StoreBackend::S3),
            other => Err(anyhow!("invalid store backend `{other}`: use `fs` or `s3`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source_tag: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShelfConfig {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialShelfConfig {
    store: Option<StoreConfig>,
    ingest: Option<IngestConfig>,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_first(vars: &[&str]) -> Option<String> {
    vars.iter().find_map(|var| env_non_empty(var))
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

pub fn validate_source_tag(tag: &str) -> Result<()> {
    if tag.is_empty() || tag.contains('/') || tag.chars().any(char::is_whitespace) {
        return Err(anyhow!(
            "invalid source tag `{tag}`: must be non-empty without `/` or whitespace"
        ));
    }
    Ok(())
}

fn validate(cfg: &ShelfConfig) -> Result<()> {
    let backend = cfg.store.backend_kind()?;
    if backend == StoreBackend::S3 && cfg.store.bucket.trim().is_empty() {
        return Err(anyhow!(
            "s3 store selected but no bucket configured: set BUCKET_NAME"
        ));
    }
    if backend == StoreBackend::S3 && cfg.store.region.trim().is_empty() {
        return Err(anyhow!("invalid s3 region: cannot be empty"));
    }
    validate_source_tag(&cfg.ingest.source_tag)
}

pub fn resolve_config_path(paths: &ShelfPaths) -> PathBuf {
    env_non_empty("JOBSHELF_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.home.join("jobshelf.toml"))
}

fn merge_file_config(paths: &ShelfPaths, base: &mut ShelfConfig) -> Result<()> {
    let path = resolve_config_path(paths);
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialShelfConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse jobshelf config {}: {err}", path.display()))?;
    if let Some(store) = parsed.store {
        base.store = store;
    }
    if let Some(ingest) = parsed.ingest {
        base.ingest = ingest;
    }
    Ok(())
}

/// Defaults, then the TOML file, then environment variables. `BUCKET_NAME`
/// and `ENDPOINT_URL` are honoured for compatibility with existing `.env`
/// files.
pub fn load_config(paths: &ShelfPaths) -> Result<ShelfConfig> {
    let mut cfg = ShelfConfig::default();
    merge_file_config(paths, &mut cfg)?;

    if let Some(backend) = env_non_empty("JOBSHELF_STORE") {
        cfg.store.backend = backend;
    }
    if let Some(bucket) = env_first(&["JOBSHELF_BUCKET", "BUCKET_NAME"]) {
        cfg.store.bucket = bucket;
    }
    if let Some(endpoint) = env_first(&["JOBSHELF_ENDPOINT_URL", "ENDPOINT_URL"]) {
        cfg.store.endpoint_url = Some(endpoint);
    }
    if let Some(region) = env_first(&["JOBSHELF_REGION", "AWS_REGION"]) {
        cfg.store.region = region;
    }
    cfg.store.force_path_style =
        env_or_bool("JOBSHELF_FORCE_PATH_STYLE", cfg.store.force_path_style);
    if let Some(tag) = env_non_empty("JOBSHELF_SOURCE_TAG") {
        cfg.ingest.source_tag = tag;
    }

    validate(&cfg)?;
    Ok(cfg)
}
