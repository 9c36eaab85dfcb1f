use crate::error::StoreError;
use crate::store::{GetOutcome, ObjectStore};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

/// Map-backed store with per-key fault injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    failing_gets: RefCell<BTreeSet<String>>,
    failing_puts: RefCell<BTreeSet<String>>,
    puts: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, body: &[u8]) {
        self.objects
            .borrow_mut()
            .insert(key.to_string(), body.to_vec());
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.borrow().get(key).cloned()
    }

    pub fn object_text(&self, key: &str) -> Option<String> {
        self.object(key)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn fail_get(&self, key: &str) {
        self.failing_gets.borrow_mut().insert(key.to_string());
    }

    pub fn fail_put(&self, key: &str) {
        self.failing_puts.borrow_mut().insert(key.to_string());
    }

    pub fn put_count(&self) -> usize {
        self.puts.get()
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, key: &str) -> Result<GetOutcome, StoreError> {
        if self.failing_gets.borrow().contains(key) {
            return Err(StoreError::Unavailable(format!("injected get failure for {key}")));
        }
        Ok(match self.objects.borrow().get(key) {
            Some(bytes) => GetOutcome::Found(bytes.clone()),
            None => GetOutcome::NotFound,
        })
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<(), StoreError> {
        if self.failing_puts.borrow().contains(key) {
            return Err(StoreError::Backend {
                key: key.to_string(),
                reason: "injected put failure".to_string(),
            });
        }
        self.puts.set(self.puts.get() + 1);
        self.objects
            .borrow_mut()
            .insert(key.to_string(), body.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .borrow()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
