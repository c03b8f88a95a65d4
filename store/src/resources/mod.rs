//! Concrete bindings: one [`VersionedResourceStore`] per resource type,
//! each seeded from its own embedded dataset.

pub mod defaults;

use anyhow::Result;
use shared_types::{OwnerScope, ResourceType, VersionedObject};
use std::sync::Arc;

use crate::repository::ItemRepository;
use crate::storage::KeyValueStore;
use crate::versioned::{VersionedResourceStore, VersioningPolicy};

pub use defaults::{validate_default_item, DefaultSource, EmbeddedDefaults, NoDefaults};

/// Store for one resource type backed by its embedded defaults
pub fn binding(
    repo: ItemRepository,
    resource_type: ResourceType,
    policy: VersioningPolicy,
) -> VersionedResourceStore {
    VersionedResourceStore::new(
        repo,
        resource_type,
        Arc::new(EmbeddedDefaults::for_type(resource_type)),
    )
    .with_policy(policy)
}

/// All resource stores for one owner scope. Build one per scope and hand it
/// to whatever serves requests for that scope.
#[derive(Clone)]
pub struct ResourceStores {
    scope: OwnerScope,
    pub prompts: VersionedResourceStore,
    pub models: VersionedResourceStore,
    pub flows: VersionedResourceStore,
    pub llm_configs: VersionedResourceStore,
}

impl ResourceStores {
    pub fn new(kv: Arc<dyn KeyValueStore>, scope: OwnerScope, policy: VersioningPolicy) -> Self {
        let repo = ItemRepository::new(kv, scope);
        Self {
            scope,
            prompts: binding(repo.clone(), ResourceType::Prompt, policy),
            models: binding(repo.clone(), ResourceType::Model, policy),
            flows: binding(repo.clone(), ResourceType::Flow, policy),
            llm_configs: binding(repo, ResourceType::LlmConfig, policy),
        }
    }

    pub fn scope(&self) -> OwnerScope {
        self.scope
    }

    pub fn get(&self, resource_type: ResourceType) -> &VersionedResourceStore {
        match resource_type {
            ResourceType::Prompt => &self.prompts,
            ResourceType::Model => &self.models,
            ResourceType::Flow => &self.flows,
            ResourceType::LlmConfig => &self.llm_configs,
        }
    }

    /// Seed every resource type the owner has nothing of yet. Types that
    /// already hold references are only listed, never re-seeded.
    pub async fn ensure_seeded(
        &self,
        owner: &str,
    ) -> Result<Vec<(ResourceType, Vec<VersionedObject>)>> {
        let mut listed = Vec::with_capacity(ResourceType::ALL.len());
        for resource_type in ResourceType::ALL {
            listed.push((resource_type, self.get(resource_type).get_all(owner).await?));
        }
        Ok(listed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{ObjectStoreKv, StorageConfig};
    use serde_json::json;
    use shared_types::ResourceDraft;

    fn stores(scope: OwnerScope) -> ResourceStores {
        let kv: Arc<dyn KeyValueStore> =
            Arc::new(ObjectStoreKv::from_config(StorageConfig::memory()).unwrap());
        ResourceStores::new(kv, scope, VersioningPolicy::default())
    }

    #[test]
    fn test_bindings_carry_their_type() {
        let stores = stores(OwnerScope::User);
        for resource_type in ResourceType::ALL {
            assert_eq!(stores.get(resource_type).resource_type(), resource_type);
        }
        assert_eq!(stores.scope(), OwnerScope::User);
    }

    #[tokio::test]
    async fn test_each_type_bootstraps_its_own_defaults() {
        let stores = stores(OwnerScope::User);

        let models = stores.models.get_all("u1").await.unwrap();
        assert!(!models.is_empty());
        assert!(models.iter().all(|m| m.data_type == ResourceType::Model));

        let prompts = stores.prompts.get_all("u1").await.unwrap();
        assert!(prompts.iter().any(|p| p.name == "summarize"));
        assert!(prompts.iter().all(|p| p.user_id == "u1" && p.created_by == "system"));
    }

    #[tokio::test]
    async fn test_seeding_twice_keeps_owner_edits() {
        let stores = stores(OwnerScope::User);

        let first = stores.ensure_seeded("u1").await.unwrap();
        assert_eq!(first.len(), ResourceType::ALL.len());
        assert!(first.iter().all(|(_, objects)| !objects.is_empty()));

        stores
            .prompts
            .save(
                "u1",
                ResourceDraft::new("summarize", "u1", json!({"template": "mine"}))
                    .with_version("1.0.0"),
            )
            .await
            .unwrap();

        stores.ensure_seeded("u1").await.unwrap();

        let kept = stores
            .prompts
            .get_one("u1", "summarize", Some("1.0.0"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.content, json!({"template": "mine"}));
        assert_eq!(kept.created_by, "u1");
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let kv: Arc<dyn KeyValueStore> =
            Arc::new(ObjectStoreKv::from_config(StorageConfig::memory()).unwrap());
        let users = ResourceStores::new(Arc::clone(&kv), OwnerScope::User, VersioningPolicy::default());
        let system = ResourceStores::new(kv, OwnerScope::System, VersioningPolicy::default());

        users
            .flows
            .save(
                "shared",
                ResourceDraft::new("private-flow", "shared", json!({}))
                    .with_version("1.0.0"),
            )
            .await
            .unwrap();

        assert!(system
            .flows
            .get_one("shared", "private-flow", None)
            .await
            .unwrap()
            .is_none());
    }
}
