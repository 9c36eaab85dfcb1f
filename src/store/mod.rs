pub mod fs;
#[cfg(test)]
pub mod memory;
pub mod s3;

use crate::error::StoreError;

/// Result of reading one object. A missing key is an ordinary outcome,
/// distinct from backend failures which travel as `StoreError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    Found(Vec<u8>),
    NotFound,
}

impl GetOutcome {
    pub fn into_option(self) -> Option<Vec<u8>> {
        match self {
            GetOutcome::Found(bytes) => Some(bytes),
            GetOutcome::NotFound => None,
        }
    }
}

/// Minimal bucket interface the ingestion core and browser consume.
pub trait ObjectStore {
    fn get(&self, key: &str) -> Result<GetOutcome, StoreError>;

    /// Full-object overwrite.
    fn put(&self, key: &str, body: &[u8]) -> Result<(), StoreError>;

    /// Keys beginning with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn describe(&self) -> String;
}
