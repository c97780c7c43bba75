//! Filesystem storage backend: one file per key under a data directory.
//!
//! Writes go to a temp file first and are renamed into place, so a crash
//! mid-write never leaves a half-written record behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use tokio::fs;
use uuid::Uuid;

use super::StorageAdapter;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

const FILE_EXT: &str = ".json";

pub struct FsAdapter {
    root: PathBuf,
}

impl FsAdapter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Probe for a usable data directory: the configured override if any,
    /// otherwise the platform data dir. Returns `None` when neither can be
    /// created, which sends startup to the in-memory fallback.
    pub fn detect(config: &EngineConfig) -> Option<Self> {
        let root = config.data_dir.clone().or_else(|| {
            ProjectDirs::from("dev", "jotkeep", "jotkeep").map(|d| d.data_dir().to_path_buf())
        })?;
        std::fs::create_dir_all(&root).ok()?;
        Some(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Keys look like "note:{uuid}"; ':' is not portable in filenames, so
    // the first ':' maps to '-' on disk. Key kinds never contain '-', which
    // makes the mapping reversible.
    fn file_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", key.replacen(':', "-", 1), FILE_EXT))
    }

    fn key_for(file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(FILE_EXT)?;
        Some(stem.replacen('-', ":", 1))
    }
}

#[async_trait]
impl StorageAdapter for FsAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.file_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        // Atomic write: temp file in the same directory, then rename.
        let tmp = self.root.join(format!(".write-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, self.file_for(key)).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.file_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = Self::key_for(name) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> (tempfile::TempDir, FsAdapter) {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FsAdapter::new(dir.path().to_path_buf());
        (dir, adapter)
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (_dir, adapter) = adapter();
        adapter.set("note:abc", "{\"x\":1}").await.unwrap();
        assert_eq!(
            adapter.get("note:abc").await.unwrap(),
            Some("{\"x\":1}".to_string())
        );
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let (_dir, adapter) = adapter();
        assert_eq!(adapter.get("note:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites() {
        let (_dir, adapter) = adapter();
        adapter.set("note:abc", "old").await.unwrap();
        adapter.set("note:abc", "new").await.unwrap();
        assert_eq!(adapter.get("note:abc").await.unwrap(), Some("new".into()));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, adapter) = adapter();
        adapter.set("note:abc", "x").await.unwrap();
        adapter.remove("note:abc").await.unwrap();
        adapter.remove("note:abc").await.unwrap();
        assert_eq!(adapter.get("note:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_filters_by_prefix() {
        let (_dir, adapter) = adapter();
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        adapter.set(&format!("note:{}", id_a), "a").await.unwrap();
        adapter.set(&format!("note:{}", id_b), "b").await.unwrap();
        adapter.set("template:xyz", "t").await.unwrap();

        let mut notes = adapter.keys("note:").await.unwrap();
        notes.sort();
        let mut expected = vec![format!("note:{}", id_a), format!("note:{}", id_b)];
        expected.sort();
        assert_eq!(notes, expected);

        assert_eq!(
            adapter.keys("template:").await.unwrap(),
            vec!["template:xyz".to_string()]
        );
    }

    #[tokio::test]
    async fn keys_on_empty_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FsAdapter::new(dir.path().join("never-created"));
        assert!(adapter.keys("note:").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn temp_files_are_invisible_to_keys() {
        let (dir, adapter) = adapter();
        std::fs::write(dir.path().join(".write-leftover.tmp"), "junk").unwrap();
        adapter.set("note:abc", "x").await.unwrap();
        assert_eq!(
            adapter.keys("note:").await.unwrap(),
            vec!["note:abc".to_string()]
        );
    }

    #[test]
    fn key_filename_mapping_is_reversible() {
        let id = Uuid::new_v4();
        let key = format!("note:{}", id);
        let adapter = FsAdapter::new(PathBuf::from("/tmp"));
        let file = adapter.file_for(&key);
        let name = file.file_name().unwrap().to_str().unwrap();
        assert_eq!(FsAdapter::key_for(name), Some(key));
    }
}
