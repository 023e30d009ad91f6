#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use memory::MemoryStore;

/// Plain key-value service holding one serialized game record per key.
///
/// Implementations make no promise about multi-key atomicity; callers that need
/// read-modify-write consistency serialize access per key themselves.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, `None` when absent.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap liveness probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish whatever the backend needs after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
