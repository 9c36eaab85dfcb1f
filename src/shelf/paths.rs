use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ShelfPaths {
    pub home: PathBuf,
    pub staging_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub log_file: PathBuf,
    pub store_dir: PathBuf,
}

impl ShelfPaths {
    pub fn lock_file(&self) -> PathBuf {
        self.logs_dir.join("ingest.lock")
    }
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

pub fn resolve_paths() -> Result<ShelfPaths> {
    let home = match env_path("JOBSHELF_HOME") {
        Some(home) => home,
        None => required_home_dir()?.join(".jobshelf"),
    };

    let staging_dir = env_or_default_path("JOBSHELF_STAGING_DIR", home.join("data"));
    let logs_dir = env_or_default_path("JOBSHELF_LOGS_DIR", home.join("logs"));
    let log_file = env_or_default_path("JOBSHELF_LOG_FILE", logs_dir.join("jobs.log"));
    let store_dir = env_or_default_path("JOBSHELF_STORE_DIR", home.join("bucket"));

    Ok(ShelfPaths {
        home,
        staging_dir,
        logs_dir,
        log_file,
        store_dir,
    })
}
