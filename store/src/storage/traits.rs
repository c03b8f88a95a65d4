use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Two-part address of an item: the owner partition and the item's sort key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub partition: String,
    pub sort_key: String,
}

impl StoreKey {
    pub fn new(partition: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort_key: sort_key.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort_key)
    }
}

/// Minimal document store the versioned layer is built on.
///
/// Reads of absent keys return `None`, deleting an absent key succeeds.
/// `increment` must be atomic: when the counter is absent it starts from
/// `initial`, the stored field becomes the previous value plus one and the
/// new value is returned.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &StoreKey) -> Result<Option<Value>>;
    async fn put(&self, key: &StoreKey, item: &Value) -> Result<()>;
    async fn delete(&self, key: &StoreKey) -> Result<()>;
    /// Items in `partition` whose sort key starts with `prefix`, ordered by key
    async fn query_prefix(&self, partition: &str, prefix: &str) -> Result<Vec<Value>>;
    async fn increment(&self, key: &StoreKey, field: &str, initial: i64) -> Result<i64>;
}
