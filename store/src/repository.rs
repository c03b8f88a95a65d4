//! Owner-scoped, typed access to the key/value store.
//!
//! Item ids are normalized before they become sort keys so that
//! `"My  Prompt"` and `"my prompt"` address the same item.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::OwnerScope;
use std::sync::Arc;

use crate::storage::{KeyValueStore, StoreKey};

/// Separator that replaces runs of whitespace in item ids
const ID_SEPARATOR: &str = "-";

pub fn normalize_id(id: &str) -> String {
    id.split_whitespace()
        .collect::<Vec<_>>()
        .join(ID_SEPARATOR)
        .to_lowercase()
}

/// Prefixes keep a trailing separator, so only the text before it is normalized
fn normalize_prefix(prefix: &str) -> String {
    let trailing = prefix.ends_with(char::is_whitespace);
    let mut normalized = normalize_id(prefix);
    if trailing && !normalized.is_empty() {
        normalized.push_str(ID_SEPARATOR);
    }
    normalized
}

#[derive(Clone)]
pub struct ItemRepository {
    kv: Arc<dyn KeyValueStore>,
    scope: OwnerScope,
}

impl ItemRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>, scope: OwnerScope) -> Self {
        Self { kv, scope }
    }

    pub fn scope(&self) -> OwnerScope {
        self.scope
    }

    fn key(&self, owner: &str, id: &str) -> StoreKey {
        StoreKey::new(self.scope.partition(owner), normalize_id(id))
    }

    pub async fn get<T: DeserializeOwned>(&self, owner: &str, id: &str) -> Result<Option<T>> {
        let key = self.key(owner, id);
        match self.kv.get(&key).await? {
            Some(value) => {
                let item = serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode item {key}"))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize>(&self, owner: &str, id: &str, item: &T) -> Result<()> {
        let value = serde_json::to_value(item)?;
        self.kv.put(&self.key(owner, id), &value).await
    }

    pub async fn delete(&self, owner: &str, id: &str) -> Result<()> {
        self.kv.delete(&self.key(owner, id)).await
    }

    /// Raw documents under a prefix; callers decide how to interpret them
    pub async fn query_by_prefix<T: DeserializeOwned>(
        &self,
        owner: &str,
        prefix: &str,
    ) -> Result<Vec<T>> {
        let partition = self.scope.partition(owner);
        let values = self
            .kv
            .query_prefix(&partition, &normalize_prefix(prefix))
            .await?;

        values
            .into_iter()
            .map(|value| {
                serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode item under {partition}/{prefix}"))
            })
            .collect()
    }

    pub async fn increment_counter(
        &self,
        owner: &str,
        id: &str,
        field: &str,
        initial: i64,
    ) -> Result<i64> {
        self.kv.increment(&self.key(owner, id), field, initial).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{ObjectStoreKv, StorageConfig};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        text: String,
    }

    fn repository(scope: OwnerScope) -> (ItemRepository, Arc<dyn KeyValueStore>) {
        let kv: Arc<dyn KeyValueStore> =
            Arc::new(ObjectStoreKv::from_config(StorageConfig::memory()).unwrap());
        (ItemRepository::new(Arc::clone(&kv), scope), kv)
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("Greeting"), "greeting");
        assert_eq!(normalize_id("  My   Daily\tPrompt "), "my-daily-prompt");
        assert_eq!(normalize_id("ref#prompt#Hello World"), "ref#prompt#hello-world");
        assert_eq!(normalize_id(""), "");
    }

    #[test]
    fn test_normalize_prefix_keeps_trailing_separator() {
        assert_eq!(normalize_prefix("ref#prompt#"), "ref#prompt#");
        assert_eq!(normalize_prefix("ref#prompt#My "), "ref#prompt#my-");
    }

    #[tokio::test]
    async fn test_lookup_ignores_formatting() {
        let (repo, _) = repository(OwnerScope::User);

        let note = Note {
            text: "hi".to_string(),
        };
        repo.put("u1", "ref#prompt#My  Prompt", &note).await.unwrap();

        let found: Option<Note> = repo.get("u1", "REF#PROMPT#my prompt").await.unwrap();
        assert_eq!(found, Some(note));
    }

    #[tokio::test]
    async fn test_items_are_owner_and_scope_scoped() {
        let (users, kv) = repository(OwnerScope::User);
        let system = ItemRepository::new(kv, OwnerScope::System);

        users
            .put("u1", "item", &Note { text: "user".to_string() })
            .await
            .unwrap();

        assert!(users.get::<Note>("u2", "item").await.unwrap().is_none());
        assert!(system.get::<Note>("u1", "item").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_and_delete() {
        let (repo, _) = repository(OwnerScope::User);

        for name in ["b", "a", "c"] {
            repo.put("u1", &format!("ref#flow#{name}"), &Note { text: name.to_string() })
                .await
                .unwrap();
        }
        repo.delete("u1", "ref#flow#b").await.unwrap();

        let notes: Vec<Note> = repo.query_by_prefix("u1", "ref#flow#").await.unwrap();
        let texts: Vec<_> = notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_increment_counter_uses_normalized_id() {
        let (repo, _) = repository(OwnerScope::System);

        assert_eq!(
            repo.increment_counter("g", "prompt#latest#Daily Brief", "versions", 0)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            repo.increment_counter("g", "prompt#latest#daily brief", "versions", 0)
                .await
                .unwrap(),
            2
        );
    }
}
