//! Named, versioned resources on top of [`ItemRepository`].
//!
//! Per owner and resource type there is one [`Reference`] per name holding the
//! version history, and one [`VersionedObject`] per version holding content.
//! Content is keyed by the reference id, not the name, so renames never touch
//! it.
//!
//! Reference and content writes are sequential, not transactional, and there
//! is no compare-and-swap on the reference: two concurrent saves for the same
//! name can both read the same snapshot and the later reference write wins,
//! dropping the other writer's version entry while its content stays stored.

mod item;
mod policy;


use anyhow::{bail, Result};
use chrono::Utc;
use shared_types::{Reference, ResourceDraft, ResourceType, Version, VersionedObject};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::repository::{normalize_id, ItemRepository};
use crate::resources::defaults::{validate_default_item, DefaultSource};
use crate::storage::StorageError;

use item::{content_id, counter_id, reference_id, reference_prefix, StoredItem};
pub use policy::{CounterFallback, VersioningPolicy};

const VERSION_PREFIX: &str = "1.0";
const COUNTER_FIELD: &str = "versions";
const COUNTER_INITIAL: i64 = 0;
/// Metadata keys owned by the store itself
const RESERVED_METADATA_KEYS: [&str; 2] = ["createdAt", "updatedAt"];

#[derive(Clone)]
pub struct VersionedResourceStore {
    repo: ItemRepository,
    resource_type: ResourceType,
    defaults: Arc<dyn DefaultSource>,
    policy: VersioningPolicy,
}

impl VersionedResourceStore {
    pub fn new(
        repo: ItemRepository,
        resource_type: ResourceType,
        defaults: Arc<dyn DefaultSource>,
    ) -> Self {
        Self {
            repo,
            resource_type,
            defaults,
            policy: VersioningPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: VersioningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    async fn read_reference(&self, owner: &str, name: &str) -> Result<Option<Reference>> {
        let item: Option<StoredItem> = self
            .repo
            .get(owner, &reference_id(self.resource_type, name))
            .await?;
        Ok(item.and_then(StoredItem::into_reference))
    }

    async fn read_object(&self, owner: &str, item_id: &str) -> Result<Option<VersionedObject>> {
        let item: Option<StoredItem> = self.repo.get(owner, item_id).await?;
        Ok(item.and_then(StoredItem::into_object))
    }

    async fn write_reference(&self, owner: &str, name: &str, reference: Reference) -> Result<()> {
        self.repo
            .put(
                owner,
                &reference_id(self.resource_type, name),
                &StoredItem::Reference(reference),
            )
            .await
    }

    /// Latest content of every resource of this type. An owner with no
    /// references at all is seeded from the default dataset first.
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn get_all(&self, owner: &str) -> Result<Vec<VersionedObject>> {
        let items: Vec<StoredItem> = self
            .repo
            .query_by_prefix(owner, &reference_prefix(self.resource_type))
            .await?;
        let references: Vec<Reference> = items
            .into_iter()
            .filter_map(StoredItem::into_reference)
            .collect();

        if references.is_empty() {
            info!("No {} references for {}, loading defaults", self.resource_type, owner);
            return self.load_defaults(owner).await;
        }

        let mut objects = Vec::with_capacity(references.len());
        for reference in references {
            let Some(latest) = reference.latest() else {
                continue;
            };
            match self.read_object(owner, &latest.item_id).await? {
                Some(object) => objects.push(object),
                None => warn!(
                    "Skipping {}: content for version {} is missing",
                    reference.display_name, latest.version
                ),
            }
        }

        debug!("Found {} {} resources for {}", objects.len(), self.resource_type, owner);
        Ok(objects)
    }

    /// Content of one version, or of the latest when `version` is `None`
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn get_one(
        &self,
        owner: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<VersionedObject>> {
        let Some(reference) = self.read_reference(owner, name).await? else {
            return Ok(None);
        };

        let entry = match version {
            Some(version) => reference.find(version),
            None => reference.latest(),
        };
        match entry {
            Some(entry) => self.read_object(owner, &entry.item_id).await,
            None => Ok(None),
        }
    }

    /// Version history for a name. Unknown names get a fresh, unsaved
    /// reference with no versions.
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn get_versions(&self, owner: &str, name: &str) -> Result<Reference> {
        Ok(self
            .read_reference(owner, name)
            .await?
            .unwrap_or_else(|| Reference::new(Uuid::new_v4().to_string(), name)))
    }

    /// Store a version of a resource. Saving a label that already exists
    /// replaces its content and leaves the history unchanged.
    #[instrument(skip(self, draft), fields(resource_type = %self.resource_type, name = %draft.name))]
    pub async fn save(&self, owner: &str, draft: ResourceDraft) -> Result<VersionedObject> {
        let ResourceDraft {
            name,
            version,
            created_by,
            content,
            description,
            tags,
            metadata,
        } = draft;

        if normalize_id(&name).is_empty() {
            bail!("Resource name must not be empty");
        }

        let mut reference = self
            .read_reference(owner, &name)
            .await?
            .unwrap_or_else(|| Reference::new(Uuid::new_v4().to_string(), name.as_str()));

        let version = match version {
            Some(version) => version,
            None => self.assign_version(owner, &name, &reference).await?,
        };

        let item_id = reference.find(&version).map_or_else(
            || content_id(self.resource_type, &reference.id, &version),
            |existing| existing.item_id.clone(),
        );

        let now = Utc::now();
        let object = VersionedObject {
            name: name.clone(),
            version: version.clone(),
            created_by: created_by.clone(),
            user_id: owner.to_string(),
            data_type: self.resource_type,
            updated_at: now,
            description,
            tags,
            content,
        };

        let added = reference.push_version(Version {
            version: version.clone(),
            item_id: item_id.clone(),
            created_at: now,
            created_by,
        });
        for (key, value) in metadata {
            if RESERVED_METADATA_KEYS.contains(&key.as_str()) {
                continue;
            }
            reference.metadata.extra.insert(key, value);
        }
        reference.touch(now);

        self.repo
            .put(owner, &item_id, &StoredItem::Object(object.clone()))
            .await?;
        self.write_reference(owner, &name, reference).await?;

        if added {
            info!("Saved {} {} version {}", self.resource_type, name, version);
        } else {
            info!("Replaced {} {} version {}", self.resource_type, name, version);
        }
        Ok(object)
    }

    /// Draw counter labels until one is unused by `reference`. The counter
    /// never repeats a value, so one draw more than the number of existing
    /// entries always lands on a free label; only timestamp fallbacks can
    /// run out.
    async fn assign_version(&self, owner: &str, name: &str, reference: &Reference) -> Result<String> {
        let draws = reference.versions.len() + 1;
        for _ in 0..draws {
            let label = self.get_next_version(owner, name).await?;
            if !reference.contains(&label) {
                return Ok(label);
            }
            debug!("Version {} already used by {}, drawing again", label, name);
        }

        Err(StorageError::LabelExhausted {
            name: name.to_string(),
            attempts: draws,
        }
        .into())
    }

    /// Remove one version, or the whole resource when `version` is `None`.
    /// Returns whether anything was removed.
    ///
    /// The reference is rewritten before content is deleted, so a failure in
    /// between can orphan content but never leaves a dangling entry.
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn delete(&self, owner: &str, name: &str, version: Option<&str>) -> Result<bool> {
        let Some(mut reference) = self.read_reference(owner, name).await? else {
            debug!("Nothing to delete for {}", name);
            return Ok(false);
        };
        let key = reference_id(self.resource_type, name);

        match version {
            Some(version) => {
                let Some(removed) = reference.remove_version(version) else {
                    return Ok(false);
                };

                if reference.is_empty() {
                    self.repo.delete(owner, &key).await?;
                } else {
                    reference.touch(Utc::now());
                    self.write_reference(owner, name, reference).await?;
                }
                self.repo.delete(owner, &removed.item_id).await?;

                info!("Deleted {} {} version {}", self.resource_type, name, version);
            }
            None => {
                self.repo.delete(owner, &key).await?;
                for entry in &reference.versions {
                    self.repo.delete(owner, &entry.item_id).await?;
                }

                info!(
                    "Deleted {} {} with {} versions",
                    self.resource_type,
                    name,
                    reference.versions.len()
                );
            }
        }

        Ok(true)
    }

    /// Move a reference to a new name, keeping its id and history.
    /// Returns `None` when `old_name` does not exist.
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn rename(
        &self,
        owner: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<Option<Reference>> {
        if normalize_id(new_name).is_empty() {
            bail!("Resource name must not be empty");
        }

        let Some(reference) = self.read_reference(owner, old_name).await? else {
            return Ok(None);
        };

        let old_key = reference_id(self.resource_type, old_name);
        let new_key = reference_id(self.resource_type, new_name);
        let same_key = normalize_id(&old_key) == normalize_id(&new_key);

        if !same_key && self.read_reference(owner, new_name).await?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "{} {} already exists",
                self.resource_type, new_name
            ))
            .into());
        }

        let mut renamed = Reference {
            display_name: new_name.to_string(),
            ..reference
        };
        renamed.touch(Utc::now());

        self.write_reference(owner, new_name, renamed.clone()).await?;
        if !same_key {
            self.repo.delete(owner, &old_key).await?;
        }

        info!("Renamed {} {} to {}", self.resource_type, old_name, new_name);
        Ok(Some(renamed))
    }

    /// Next server-assigned label for a name, `1.0.{counter}`
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn get_next_version(&self, owner: &str, name: &str) -> Result<String> {
        let counter = counter_id(self.resource_type, name);

        match self
            .repo
            .increment_counter(owner, &counter, COUNTER_FIELD, COUNTER_INITIAL)
            .await
        {
            Ok(value) => Ok(format!("{VERSION_PREFIX}.{value}")),
            Err(e) => match self.policy.counter_fallback {
                CounterFallback::Timestamp => {
                    warn!("Version counter {} failed, using timestamp label: {:#}", counter, e);
                    Ok(format!("{VERSION_PREFIX}.{}", Utc::now().timestamp_millis()))
                }
                CounterFallback::Fail => Err(StorageError::CounterUnavailable {
                    key: counter,
                    reason: format!("{e:#}"),
                }
                .into()),
            },
        }
    }

    /// Seed an owner from the default dataset through the normal save path.
    /// Invalid or failing entries are logged and skipped.
    #[instrument(skip(self), fields(resource_type = %self.resource_type))]
    pub async fn load_defaults(&self, owner: &str) -> Result<Vec<VersionedObject>> {
        let raw_items = match self.defaults.default_items() {
            Ok(items) => items,
            Err(e) => {
                warn!("Default dataset for {} unavailable: {:#}", self.resource_type, e);
                return Ok(Vec::new());
            }
        };

        let mut loaded = Vec::with_capacity(raw_items.len());
        for (index, raw) in raw_items.iter().enumerate() {
            let item = match validate_default_item(index, raw) {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping default {}: {}", self.resource_type, e);
                    continue;
                }
            };

            let name = item.name.clone();
            match self.save(owner, ResourceDraft::from(item)).await {
                Ok(object) => loaded.push(object),
                Err(e) => warn!("Failed to save default {} {}: {:#}", self.resource_type, name, e),
            }
        }

        info!(
            "Loaded {} of {} default {} resources for {}",
            loaded.len(),
            raw_items.len(),
            self.resource_type,
            owner
        );
        Ok(loaded)
    }
}
