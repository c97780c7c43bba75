//! In-memory storage backend.
//!
//! Used as the fallback when no writable data directory exists, and as the
//! test backend. Clones share the same underlying map, so tests can keep a
//! handle to flip failure simulation while the engine owns its copy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::StorageAdapter;
use crate::error::{EngineError, Result};

#[derive(Clone, Default)]
pub struct MemAdapter {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `set` fail with a persistence error. For testing the
    /// rollback path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `remove` fail with a persistence error.
    pub fn set_fail_removes(&self, fail: bool) {
        self.inner.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored entries. Test helper.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageAdapter for MemAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::Persistence("simulated write failure".to_string()));
        }
        self.inner
            .entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.inner.fail_removes.load(Ordering::SeqCst) {
            return Err(EngineError::Persistence("simulated remove failure".to_string()));
        }
        self.inner.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
