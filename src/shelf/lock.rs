use crate::shelf::util::now_epoch_secs;
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub build_uuid: String,
    pub started_at_epoch_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Absent,
    Free,
    Held(Option<LockHolder>),
}

/// Exclusive advisory lock held for the duration of one local ingestion run.
/// Released on drop.
#[derive(Debug)]
pub struct IngestLock {
    file: File,
    path: PathBuf,
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

pub fn read_holder(path: &Path) -> Option<LockHolder> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(raw.trim()).ok()
}

impl IngestLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut file = open_lock_file(path)?;
        if FileExt::try_lock_exclusive(&file).is_err() {
            let holder = read_holder(path)
                .map(|h| format!("pid={} started_at={}", h.pid, h.started_at_epoch_secs))
                .unwrap_or_else(|| "unknown holder".to_string());
            anyhow::bail!(
                "another ingestion is running ({holder}); lock file {}",
                path.display()
            );
        }

        let holder = LockHolder {
            pid: std::process::id(),
            build_uuid: env!("BUILD_UUID").to_string(),
            started_at_epoch_secs: now_epoch_secs()?,
        };
        file.set_len(0)?;
        file.write_all(format!("{}\n", serde_json::to_string(&holder)?).as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn probe(path: &Path) -> Result<LockState> {
    if !path.exists() {
        return Ok(LockState::Absent);
    }
    let file = open_lock_file(path)?;
    if FileExt::try_lock_exclusive(&file).is_ok() {
        let _ = FileExt::unlock(&file);
        return Ok(LockState::Free);
    }
    Ok(LockState::Held(read_holder(path)))
}
