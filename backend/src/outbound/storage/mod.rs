//! Object-store backed content store.
//!
//! Wraps any `object_store::ObjectStore` (S3 in production, a local
//! directory or memory in tests) behind the `ContentStore` port. Keys are
//! derived from the injected clock in UTC.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use mockable::{Clock, DefaultClock};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tracing::{error, info};

use crate::domain::ObjectKey;
use crate::domain::ports::{ContentStore, ContentStoreError};

/// Content store over an `object_store` backend.
pub struct ObjectStoreContentStore {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    location: String,
}

impl ObjectStoreContentStore {
    /// Wrap an existing backend. `location` names it in logs, typically the
    /// bucket.
    pub fn new(store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>, location: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            location: location.into(),
        }
    }

    /// S3 bucket store configured from the standard `AWS_*` environment.
    ///
    /// # Errors
    ///
    /// Returns `Backend` when the S3 client cannot be configured.
    pub fn s3(bucket: &str) -> Result<Self, ContentStoreError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|err| ContentStoreError::backend(bucket, err.to_string()))?;
        Ok(Self::new(Arc::new(store), Arc::new(DefaultClock), bucket))
    }

    /// Store rooted at a local directory, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns `Backend` when the directory cannot be opened.
    pub fn local(root: &std::path::Path) -> Result<Self, ContentStoreError> {
        let location = root.display().to_string();
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|err| ContentStoreError::backend(location.as_str(), err.to_string()))?;
        Ok(Self::new(Arc::new(store), Arc::new(DefaultClock), location))
    }

    /// Volatile in-process store.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(InMemory::new()), clock, "memory")
    }
}

#[async_trait]
impl ContentStore for ObjectStoreContentStore {
    async fn put(&self, data: &[u8], name_prefix: &str) -> Result<ObjectKey, ContentStoreError> {
        let key = ObjectKey::derive(name_prefix, self.clock.utc());
        let path = Path::from(key.as_str());
        let payload = PutPayload::from_bytes(Bytes::copy_from_slice(data));

        info!(location = %self.location, %key, bytes = data.len(), "writing object");
        self.store.put(&path, payload).await.map_err(|err| {
            error!(location = %self.location, %key, error = %err, "object write failed");
            ContentStoreError::backend(key.as_str(), err.to_string())
        })?;
        Ok(key)
    }

    async fn get(&self, key: &ObjectKey) -> Result<Vec<u8>, ContentStoreError> {
        let path = Path::from(key.as_str());
        info!(location = %self.location, %key, "reading object");
        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                error!(location = %self.location, %key, "object not found");
                return Err(ContentStoreError::not_found(key.as_str()));
            }
            Err(err) => return Err(backend_error(&self.location, key, &err)),
        };
        let data = result
            .bytes()
            .await
            .map_err(|err| backend_error(&self.location, key, &err))?;
        info!(location = %self.location, %key, bytes = data.len(), "object read");
        Ok(data.to_vec())
    }
}

fn backend_error(location: &str, key: &ObjectKey, err: &object_store::Error) -> ContentStoreError {
    error!(location, %key, error = %err, "object read failed");
    ContentStoreError::backend(key.as_str(), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedClock;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> ObjectStoreContentStore {
        ObjectStoreContentStore::in_memory(Arc::new(FixedClock::at(2011, 12, 3, 10, 15, 30)))
    }

    #[rstest]
    #[tokio::test]
    async fn put_returns_date_partitioned_key(store: ObjectStoreContentStore) {
        let key = store.put(b"abc", "card1").await.expect("put succeeds");
        assert_eq!(key.as_str(), "2011/12/03/card1-2011-12-03T10-15-30.xlsx");
    }

    #[rstest]
    #[tokio::test]
    async fn get_returns_stored_bytes(store: ObjectStoreContentStore) {
        let data = vec![0_u8, 159, 146, 150, 255];
        let key = store.put(&data, "card1").await.expect("put succeeds");
        assert_eq!(store.get(&key).await.expect("get succeeds"), data);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_objects_are_not_found(store: ObjectStoreContentStore) {
        let key = ObjectKey::parse("2011/12/03/absent.xlsx").expect("key");
        let error = store.get(&key).await.expect_err("object is absent");
        assert_eq!(error, ContentStoreError::not_found("2011/12/03/absent.xlsx"));
    }

    #[tokio::test]
    async fn local_directory_round_trip() {
        let root = tempfile::tempdir().expect("temp dir");
        let store = ObjectStoreContentStore::local(root.path()).expect("local store");
        let key = store.put(b"spreadsheet", "card9").await.expect("put succeeds");

        assert!(key.file_name().starts_with("card9-"));
        assert_eq!(store.get(&key).await.expect("get succeeds"), b"spreadsheet".to_vec());
    }
}
