use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::{Path, PathPart};
use object_store::{ObjectStore, PutPayload};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::config::StorageConfig;
use super::error::StorageError;
use super::traits::{KeyValueStore, StoreKey};

/// Key/value documents on top of an `object_store` backend.
///
/// Each item is one JSON object at `{partition}/{sort_key}.json`.
pub struct ObjectStoreKv {
    store: Arc<dyn ObjectStore>,
    counter_lock: Mutex<()>,
}

impl ObjectStoreKv {
    pub fn from_config(config: StorageConfig) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match config {
            StorageConfig::Local { path } => {
                info!("Initializing local storage at: {:?}", path);
                std::fs::create_dir_all(&path)
                    .with_context(|| format!("Failed to create storage directory {path:?}"))?;
                Arc::new(LocalFileSystem::new_with_prefix(path)?)
            }
            StorageConfig::S3 {
                bucket,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                allow_http,
            } => {
                info!("Initializing S3 storage in bucket: {}", bucket);
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_allow_http(allow_http);
                if let Some(region) = region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Some(access_key_id) = access_key_id {
                    builder = builder.with_access_key_id(access_key_id);
                }
                if let Some(secret_access_key) = secret_access_key {
                    builder = builder.with_secret_access_key(secret_access_key);
                }
                Arc::new(builder.build()?)
            }
            StorageConfig::Memory => {
                info!("Initializing in-memory storage");
                Arc::new(InMemory::new())
            }
        };

        Ok(Self::new(store))
    }

    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            counter_lock: Mutex::new(()),
        }
    }

    fn item_path(key: &StoreKey) -> Path {
        Path::from_iter([
            PathPart::from(key.partition.as_str()),
            PathPart::from(format!("{}.json", key.sort_key)),
        ])
    }

    fn partition_path(partition: &str) -> Path {
        Path::from_iter([PathPart::from(partition)])
    }
}

#[async_trait]
impl KeyValueStore for ObjectStoreKv {
    async fn get(&self, key: &StoreKey) -> Result<Option<Value>> {
        let path = Self::item_path(key);
        match self.store.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                let item = serde_json::from_slice(&bytes)
                    .with_context(|| format!("Failed to decode item {key}"))?;
                Ok(Some(item))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &StoreKey, item: &Value) -> Result<()> {
        debug!("Writing item {}", key);
        let json = serde_json::to_vec_pretty(item)?;
        self.store
            .put(&Self::item_path(key), PutPayload::from(json))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &StoreKey) -> Result<()> {
        debug!("Deleting item {}", key);
        match self.store.delete(&Self::item_path(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn query_prefix(&self, partition: &str, prefix: &str) -> Result<Vec<Value>> {
        let partition_path = Self::partition_path(partition);
        let encoded_prefix = PathPart::from(prefix);

        let mut locations = Vec::new();
        let mut stream = self.store.list(Some(&partition_path));
        while let Some(meta) = stream.next().await.transpose()? {
            let matches = meta
                .location
                .filename()
                .is_some_and(|name| name.starts_with(encoded_prefix.as_ref()));
            if matches {
                locations.push(meta.location);
            }
        }
        locations.sort();

        let mut items = Vec::with_capacity(locations.len());
        for location in locations {
            // Listed objects may vanish before they are read
            match self.store.get(&location).await {
                Ok(result) => {
                    let bytes = result.bytes().await?;
                    let item = serde_json::from_slice(&bytes)
                        .with_context(|| format!("Failed to decode item {location}"))?;
                    items.push(item);
                }
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(
            "Prefix query {}/{} matched {} items",
            partition,
            prefix,
            items.len()
        );
        Ok(items)
    }

    async fn increment(&self, key: &StoreKey, field: &str, initial: i64) -> Result<i64> {
        // Atomic within this process only
        let _guard = self.counter_lock.lock().await;

        let mut item = self
            .get(key)
            .await?
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let fields = item.as_object_mut().ok_or_else(|| StorageError::MalformedItem {
            key: key.to_string(),
            reason: "counter item is not an object".to_string(),
        })?;

        let next = fields.get(field).and_then(Value::as_i64).unwrap_or(initial) + 1;
        fields.insert(field.to_string(), Value::from(next));
        self.put(key, &item).await?;

        Ok(next)
    }
}
