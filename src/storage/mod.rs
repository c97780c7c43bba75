//! # Storage Adapter
//!
//! The engine talks to durable storage through one narrow asynchronous
//! key/value contract, [`StorageAdapter`]. This trait handles the "how" of
//! storage (filesystem vs memory), while [`crate::repo::NoteRepository`]
//! handles the "what" (record layout, schema versions).
//!
//! ## Backends
//!
//! - [`FsAdapter`]: durable backend, one file per key with atomic writes.
//! - [`MemAdapter`]: in-memory map; the capability-detection fallback and
//!   the test backend.
//!
//! The backend is chosen exactly once at startup by [`select_adapter`] and
//! injected by constructor from there on. There is no runtime switching
//! mid-session and no backend branching at call sites.
//!
//! ## Error policy
//!
//! Every operation may fail (I/O, quota, permissions). Failures surface as
//! rejected results at this layer; nothing is swallowed here. The adapter
//! is expected to resolve or reject in bounded time — a call that never
//! settles is a backend bug, not something this layer times out.

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::error::Result;

pub mod fs_adapter;
pub mod mem_adapter;

pub use fs_adapter::FsAdapter;
pub use mem_adapter::MemAdapter;

/// Abstract interface for raw key/value storage I/O.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List all stored keys starting with `prefix` (for discovery).
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl StorageAdapter for Box<dyn StorageAdapter> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys(prefix).await
    }
}

/// Choose the storage backend for this process.
///
/// Probes once for a writable data directory; without one, state lives in
/// memory for the session. The choice is fixed for the process lifetime.
pub fn select_adapter(config: &EngineConfig) -> Box<dyn StorageAdapter> {
    match FsAdapter::detect(config) {
        Some(fs) => {
            log::debug!("storage: using filesystem adapter at {:?}", fs.root());
            Box::new(fs)
        }
        None => {
            log::warn!("storage: no writable data directory, falling back to in-memory adapter");
            Box::new(MemAdapter::new())
        }
    }
}
