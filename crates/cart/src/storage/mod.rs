//! Local device storage.
//!
//! A key-value store of strings. The cart store reads and writes a single
//! well-known key holding the serialized cart snapshot and assumes no other
//! writer touches that key.

mod file;
mod memory;
pub mod snapshot;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors raised by a [`LocalStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the underlying medium failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized for storage.
    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The key contains characters the backend cannot store.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Key-value string persistence on the local device.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    /// Read the value stored under `key`.
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
