//! Session record storage
//!
//! A session record is the JSON the authoring flow saves before playback.
//! Stores are plain key-value maps; playback only ever calls `get`.

pub mod json_store;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

/// Key-value storage for persisted session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Raw record stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, record: &str) -> Result<()>;

    /// Returns whether a record was removed.
    async fn remove(&self, key: &str) -> Result<bool>;
}
