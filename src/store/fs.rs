use crate::error::StoreError;
use crate::store::{GetOutcome, ObjectStore};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Directory-backed bucket. Object keys map to `/`-separated relative paths
/// under `root`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn io_err(key: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        key: key.to_string(),
        source,
    }
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        let mut path = self.root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        Ok(path)
    }

    fn collect_keys(&self, dir: &Path, rel: &str, out: &mut Vec<String>) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(io_err(rel, err)),
        };
        for entry in entries {
            let entry = entry.map_err(|err| io_err(rel, err))?;
            let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
                continue;
            };
            // Leftovers of an interrupted put.
            if name.starts_with(".tmp") {
                continue;
            }
            let key = if rel.is_empty() {
                name
            } else {
                format!("{rel}/{name}")
            };
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, &key, out)?;
            } else if path.is_file() {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsStore {
    fn get(&self, key: &str) -> Result<GetOutcome, StoreError> {
        let path = self.object_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(GetOutcome::Found(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(GetOutcome::NotFound),
            Err(err) => Err(io_err(key, err)),
        }
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        let Some(parent) = path.parent() else {
            return Err(StoreError::InvalidKey(key.to_string()));
        };
        fs::create_dir_all(parent).map_err(|err| io_err(key, err))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|err| io_err(key, err))?;
        tmp.write_all(body).map_err(|err| io_err(key, err))?;
        tmp.as_file().sync_all().map_err(|err| io_err(key, err))?;
        tmp.persist(&path).map_err(|err| io_err(key, err.error))?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // Only walk the deepest directory the prefix pins down.
        let (dir_rel, _) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let mut start = self.root.clone();
        for segment in dir_rel.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(StoreError::InvalidKey(prefix.to_string()));
            }
            start.push(segment);
        }

        let mut keys = Vec::new();
        self.collect_keys(&start, dir_rel.trim_end_matches('/'), &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn describe(&self) -> String {
        format!("fs:{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::{FsStore, validate_key};
    use crate::error::StoreError;
    use crate::store::{GetOutcome, ObjectStore};
    use tempfile::tempdir;

    #[test]
    fn missing_object_is_not_found() {
        let tmp = tempdir().expect("tempdir");
        let store = FsStore::new(tmp.path());
        let got = store.get("jobs/year=2025/a.jsonl").expect("get");
        assert_eq!(got, GetOutcome::NotFound);
    }

    #[test]
    fn put_overwrites_whole_object() {
        let tmp = tempdir().expect("tempdir");
        let store = FsStore::new(tmp.path());
        store.put("jobs/a.jsonl", b"first\nsecond\n").expect("put");
        store.put("jobs/a.jsonl", b"third\n").expect("put");
        assert_eq!(
            store.get("jobs/a.jsonl").expect("get"),
            GetOutcome::Found(b"third\n".to_vec())
        );
    }

    #[test]
    fn list_filters_by_prefix_and_sorts() {
        let tmp = tempdir().expect("tempdir");
        let store = FsStore::new(tmp.path());
        store
            .put("jobs/year=2025/month=03/day=06/x_2025-03-06.jsonl", b"{}\n")
            .expect("put");
        store
            .put("jobs/year=2025/month=03/day=05/x_2025-03-05.jsonl", b"{}\n")
            .expect("put");
        store
            .put("jobs/year=2024/month=12/day=31/x_2024-12-31.jsonl", b"{}\n")
            .expect("put");

        let keys = store.list("jobs/year=2025/").expect("list");
        assert_eq!(
            keys,
            vec![
                "jobs/year=2025/month=03/day=05/x_2025-03-05.jsonl".to_string(),
                "jobs/year=2025/month=03/day=06/x_2025-03-06.jsonl".to_string(),
            ]
        );

        let partial = store.list("jobs/year=2025/month=03/day=0").expect("list");
        assert_eq!(partial.len(), 2);
        assert!(store.list("nothing/here/").expect("list").is_empty());
    }

    #[test]
    fn rejects_escaping_keys() {
        for key in ["", "/abs", "a/../b", "a//b", "./a", "dir/"] {
            assert!(
                matches!(validate_key(key), Err(StoreError::InvalidKey(_))),
                "{key} should be rejected"
            );
        }
        assert!(validate_key("jobs/year=2025/a.jsonl").is_ok());
    }
}
