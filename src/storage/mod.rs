//! Object storage gateway for source images and thumbnails
//! Uses Apache Arrow object_store crate

use crate::config::{StorageConfig, StorageProvider};
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, path::Path as StoragePath};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Failed to initialize store for bucket '{bucket}': {source}")]
    StoreInit {
        bucket: String,
        source: object_store::Error,
    },

    #[error("Failed to prepare local store root: {0}")]
    LocalRoot(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Metadata returned after a put
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Bucket-addressed storage client wrapping object_store.
///
/// Backend handles are built lazily, once per bucket, and cached for the
/// lifetime of the process; concurrent batches share them read-only.
pub struct StorageClient {
    config: StorageConfig,
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl StorageClient {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(StorageConfig {
            provider: StorageProvider::Memory,
            ..StorageConfig::default()
        })
    }

    /// Download raw bytes for `(bucket, key)`
    pub async fn fetch(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let store = self.store_for(bucket)?;
        let path = StoragePath::from(key);

        let result = match store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = result.bytes().await?;

        tracing::debug!(bucket, key, size = bytes.len(), "Fetched from storage");

        Ok(bytes)
    }

    /// Upload bytes to `(bucket, key)` with the given content type
    pub async fn store(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<StoredObject> {
        let store = self.store_for(bucket)?;
        let path = StoragePath::from(key);
        let size = data.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let put_result = store
            .put_opts(
                &path,
                data.into(),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(bucket, key, size, "Uploaded to storage");

        Ok(StoredObject {
            key: key.to_string(),
            etag: put_result.e_tag.clone(),
            size,
        })
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        if let Some(store) = self
            .stores
            .read()
            .expect("store cache lock poisoned")
            .get(bucket)
        {
            return Ok(store.clone());
        }

        let store = self.build_store(bucket)?;

        let mut cache = self.stores.write().expect("store cache lock poisoned");
        Ok(cache.entry(bucket.to_string()).or_insert(store).clone())
    }

    fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        match self.config.provider {
            StorageProvider::Memory => Ok(Arc::new(InMemory::new())),
            StorageProvider::Local => {
                let root = self.config.root.join(bucket);
                std::fs::create_dir_all(&root)?;

                let store =
                    LocalFileSystem::new_with_prefix(root).map_err(|source| {
                        StorageError::StoreInit {
                            bucket: bucket.to_string(),
                            source,
                        }
                    })?;
                Ok(Arc::new(store))
            }
            StorageProvider::S3 => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

                if let Some(region) = &self.config.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &self.config.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let Some(access_key) = &self.config.access_key {
                    builder = builder.with_access_key_id(access_key);
                }
                if let Some(secret_key) = &self.config.secret_key {
                    builder = builder.with_secret_access_key(secret_key);
                }

                let store = builder.build().map_err(|source| StorageError::StoreInit {
                    bucket: bucket.to_string(),
                    source,
                })?;
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let client = StorageClient::in_memory();

        let stored = client
            .store("b", "images/x.bin", Bytes::from_static(b"abc"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(stored.size, 3);

        let fetched = client.fetch("b", "images/x.bin").await.unwrap();
        assert_eq!(fetched.as_ref(), b"abc");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let client = StorageClient::in_memory();

        let result = client.fetch("b", "images/missing.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let client = StorageClient::in_memory();

        client
            .store("a", "k", Bytes::from_static(b"x"), "image/jpeg")
            .await
            .unwrap();

        assert!(client.fetch("a", "k").await.is_ok());
        assert!(matches!(
            client.fetch("b", "k").await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
