//! Driven port for the write-once content store bridging producer and
//! distributor.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::ObjectKey;

define_port_error! {
    /// Storage failures. Neither variant is retried by the store.
    pub enum ContentStoreError {
        /// No object exists under the key.
        NotFound { key: String } =>
            "object {key} not found",
        /// The backend failed the read or write.
        Backend { key: String, message: String } =>
            "storage operation on {key} failed: {message}",
    }
}

/// Whole-object put/get storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Write `data` under a key derived from `name_prefix` and the current
    /// UTC time, returning that key.
    async fn put(&self, data: &[u8], name_prefix: &str) -> Result<ObjectKey, ContentStoreError>;

    /// Read the full object stored under `key`.
    async fn get(&self, key: &ObjectKey) -> Result<Vec<u8>, ContentStoreError>;
}
