//! File-backed session store
//!
//! One `<key>.json` file per session under the sessions directory, written
//! atomically through a temp file and rename.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::SessionStore;
use crate::error::{ReplayError, Result};

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!("[Store] Session store at {:?}", dir);
        Ok(Self { dir })
    }

    /// Store under the `sessions/` directory of a storage root
    pub async fn in_root(root: &Path) -> Result<Self> {
        Self::new(replay_common::sessions_dir_in(root)).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the storage path for a session key
    fn record_path(&self, key: &str) -> PathBuf {
        replay_common::session_path_in(&self.dir, key)
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_path(key);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                debug!("[Store] Read {} bytes for '{}'", content.len(), key);
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReplayError::Store(format!(
                "failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    async fn put(&self, key: &str, record: &str) -> Result<()> {
        let path = self.record_path(key);
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, record).await?;
        fs::rename(&temp_path, &path).await?;

        debug!("[Store] Saved '{}' to {:?}", key, path);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ReplayError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_put_get_remove() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::in_root(dir.path()).await.unwrap();

        assert_eq!(store.get("chatData").await.unwrap(), None);

        assert_ok!(store.put("chatData", r#"{"entries":[]}"#).await);
        assert_eq!(
            store.get("chatData").await.unwrap().as_deref(),
            Some(r#"{"entries":[]}"#)
        );
        assert!(dir.path().join("sessions").join("chatData.json").exists());
        assert!(!dir.path().join("sessions").join("chatData.tmp").exists());

        assert!(store.remove("chatData").await.unwrap());
        assert!(!store.remove("chatData").await.unwrap());
        assert_eq!(store.get("chatData").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_record() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).await.unwrap();

        store.put("k", "first").await.unwrap();
        store.put("k", "second").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_unreadable_record_is_a_store_error() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).await.unwrap();

        // A directory where the record file should be cannot be read as text
        std::fs::create_dir(dir.path().join("broken.json")).unwrap();
        let err = assert_err!(store.get("broken").await);
        assert!(matches!(err, ReplayError::Store(_)));
    }
}
