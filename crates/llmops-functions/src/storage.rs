//! Object storage addressed by bucket and key, using object_store.
//!
//! Handlers learn the bucket from their triggering event, so stores are
//! built per bucket on first use and kept for the life of the process.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::debug;

use crate::error::{FunctionError, FunctionResult};
use crate::events::ObjectLocation;

/// Get and put whole objects.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Read an object.
    async fn get(&self, location: &ObjectLocation) -> FunctionResult<Bytes>;

    /// Write an object, replacing any existing one.
    async fn put(&self, location: &ObjectLocation, data: Bytes) -> FunctionResult<()>;
}

#[derive(Debug, Clone)]
enum Backend {
    S3 { region: Option<String> },
    Memory,
}

/// One object store per bucket, created lazily.
pub struct BucketStores {
    backend: Backend,
    stores: DashMap<String, Arc<dyn ObjectStore>>,
}

impl std::fmt::Debug for BucketStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketStores")
            .field("backend", &self.backend)
            .field("buckets", &self.stores.len())
            .finish()
    }
}

impl BucketStores {
    /// S3 stores with credentials from the environment.
    #[must_use]
    pub fn s3(region: Option<String>) -> Self {
        Self {
            backend: Backend::S3 { region },
            stores: DashMap::new(),
        }
    }

    /// In-memory stores; contents are lost when the process exits.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            stores: DashMap::new(),
        }
    }

    fn store(&self, bucket: &str) -> FunctionResult<Arc<dyn ObjectStore>> {
        if let Some(store) = self.stores.get(bucket) {
            return Ok(store.value().clone());
        }

        let store: Arc<dyn ObjectStore> = match &self.backend {
            Backend::Memory => Arc::new(object_store::memory::InMemory::new()),
            Backend::S3 { region } => {
                use object_store::aws::AmazonS3Builder;
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                let store = builder.build().map_err(|e| {
                    FunctionError::storage(bucket, "", format!("failed to create S3 store: {e}"))
                })?;
                Arc::new(store)
            }
        };

        debug!(bucket = %bucket, "object store created");
        Ok(self
            .stores
            .entry(bucket.to_owned())
            .or_insert(store)
            .value()
            .clone())
    }
}

#[async_trait]
impl ObjectStorage for BucketStores {
    async fn get(&self, location: &ObjectLocation) -> FunctionResult<Bytes> {
        let store = self.store(&location.bucket)?;
        let path = ObjectPath::from(location.key.as_str());

        let result = store
            .get(&path)
            .await
            .map_err(|e| FunctionError::storage(&location.bucket, &location.key, e))?;
        let data = result
            .bytes()
            .await
            .map_err(|e| FunctionError::storage(&location.bucket, &location.key, e))?;

        debug!(uri = %location.uri(), size = data.len(), "object read");
        Ok(data)
    }

    async fn put(&self, location: &ObjectLocation, data: Bytes) -> FunctionResult<()> {
        let store = self.store(&location.bucket)?;
        let path = ObjectPath::from(location.key.as_str());
        let size = data.len();

        store
            .put(&path, data.into())
            .await
            .map_err(|e| FunctionError::storage(&location.bucket, &location.key, e))?;

        debug!(uri = %location.uri(), size, "object written");
        Ok(())
    }
}
