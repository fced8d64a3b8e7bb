//! Persistent key-value storage the session record lives in.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Trait for a small durable string key-value store.
///
/// This is the only persistence the client needs: the session record is two
/// entries, and nothing else survives a restart. Implementations should:
/// - Return `Ok(None)` for keys that were never written or have been removed
/// - Make `remove` of a missing key a no-op
/// - Handle concurrent access safely
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Delete the value stored under `key`.
    async fn remove(&self, key: &str) -> Result<(), Error>;
}
