use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of resource a versioned store manages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceType {
    Prompt,
    Model,
    Flow,
    LlmConfig,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Prompt,
        ResourceType::Model,
        ResourceType::Flow,
        ResourceType::LlmConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Prompt => "prompt",
            ResourceType::Model => "model",
            ResourceType::Flow => "flow",
            ResourceType::LlmConfig => "llm-config",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("Unknown resource type: {s}. Must be one of prompt, model, flow, llm-config")
            })
    }
}

/// Partition class under which resources are isolated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OwnerScope {
    User,
    System,
}

impl OwnerScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerScope::User => "user",
            OwnerScope::System => "system",
        }
    }

    /// Partition key for one owner inside this scope
    pub fn partition(&self, owner: &str) -> String {
        format!("{}#{}", self.as_str(), owner)
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(OwnerScope::User),
            "system" => Ok(OwnerScope::System),
            _ => Err(format!("Unknown owner scope: {s}. Must be 'user' or 'system'")),
        }
    }
}

/// One entry in a reference's version history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version: String,
    pub item_id: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Timestamps plus arbitrary owner-supplied pairs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Per-name record tracking a resource's identity and version history.
///
/// `versions` is append-only in insertion order; the last entry is the
/// latest. `latest_version` and `versions_count` are kept in step with it by
/// [`Reference::push_version`] and [`Reference::remove_version`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: String,
    pub display_name: String,
    pub latest_version: String,
    pub versions_count: usize,
    pub versions: Vec<Version>,
    pub metadata: ReferenceMetadata,
}

impl Reference {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: display_name.into(),
            latest_version: String::new(),
            versions_count: 0,
            versions: Vec::new(),
            metadata: ReferenceMetadata {
                created_at: now,
                updated_at: now,
                extra: BTreeMap::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.find(version).is_some()
    }

    pub fn find(&self, version: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Append a version entry unless its label is already present.
    /// Returns whether the entry was added.
    pub fn push_version(&mut self, entry: Version) -> bool {
        if self.contains(&entry.version) {
            return false;
        }
        self.latest_version = entry.version.clone();
        self.versions.push(entry);
        self.versions_count = self.versions.len();
        true
    }

    /// Remove the entry with this label. The latest pointer falls back to
    /// whatever entry is now last, or empty when none remain.
    pub fn remove_version(&mut self, version: &str) -> Option<Version> {
        let index = self.versions.iter().position(|v| v.version == version)?;
        let removed = self.versions.remove(index);
        self.versions_count = self.versions.len();
        self.latest_version = self
            .versions
            .last()
            .map(|v| v.version.clone())
            .unwrap_or_default();
        Some(removed)
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.metadata.updated_at = at;
    }
}

/// Immutable content payload for one specific version of a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionedObject {
    pub name: String,
    pub version: String,
    pub created_by: String,
    pub user_id: String,
    pub data_type: ResourceType,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: Value,
}

/// Input to a save: the server assigns a version when none is given
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl ResourceDraft {
    pub fn new(name: impl Into<String>, created_by: impl Into<String>, content: Value) -> Self {
        Self {
            name: name.into(),
            version: None,
            created_by: created_by.into(),
            content,
            description: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Entry of a static default dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultItem {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<DefaultItem> for ResourceDraft {
    fn from(item: DefaultItem) -> Self {
        Self {
            name: item.name,
            version: item.version,
            created_by: item.created_by.unwrap_or_else(|| "system".to_string()),
            content: item.content,
            description: item.description,
            tags: item.tags,
            metadata: BTreeMap::new(),
        }
    }
}
