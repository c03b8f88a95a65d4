use anyhow::{Context, Result};
use serde_json::{json, Value};
use shared_types::{DefaultItem, ResourceType};

use crate::storage::StorageError;

const DEFAULT_PROMPTS: &str = include_str!("data/prompts.json");
const DEFAULT_MODELS: &str = include_str!("data/models.json");
const DEFAULT_FLOWS: &str = include_str!("data/flows.json");
const DEFAULT_LLM_CONFIGS: &str = include_str!("data/llm_configs.json");

/// Supplies the raw default dataset seeded into an empty owner partition.
///
/// Entries stay untyped here; each one is validated on its own so a bad
/// entry never takes the rest of the batch down with it.
pub trait DefaultSource: Send + Sync {
    fn default_items(&self) -> Result<Vec<Value>>;
}

/// A JSON array compiled into the binary
pub struct EmbeddedDefaults {
    source: &'static str,
}

impl EmbeddedDefaults {
    pub fn new(source: &'static str) -> Self {
        Self { source }
    }

    pub fn for_type(resource_type: ResourceType) -> Self {
        let source = match resource_type {
            ResourceType::Prompt => DEFAULT_PROMPTS,
            ResourceType::Model => DEFAULT_MODELS,
            ResourceType::Flow => DEFAULT_FLOWS,
            ResourceType::LlmConfig => DEFAULT_LLM_CONFIGS,
        };
        Self::new(source)
    }
}

impl DefaultSource for EmbeddedDefaults {
    fn default_items(&self) -> Result<Vec<Value>> {
        serde_json::from_str(self.source).context("Embedded default dataset is not a JSON array")
    }
}

pub struct NoDefaults;

impl DefaultSource for NoDefaults {
    fn default_items(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl DefaultSource for Vec<Value> {
    fn default_items(&self) -> Result<Vec<Value>> {
        Ok(self.clone())
    }
}

fn default_item_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "version", "createdBy"],
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "version": {"type": "string", "minLength": 1},
            "createdBy": {"type": "string", "minLength": 1},
            "description": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

/// Check one raw entry and turn it into a typed item
pub fn validate_default_item(index: usize, raw: &Value) -> Result<DefaultItem, StorageError> {
    let schema = default_item_schema();
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| StorageError::InvalidDefaultItem {
            index,
            reason: format!("schema failed to compile: {e}"),
        })?;

    let problems: Vec<String> = validator
        .validate(raw)
        .err()
        .into_iter()
        .flatten()
        .map(|error| error.to_string())
        .collect();
    if !problems.is_empty() {
        return Err(StorageError::InvalidDefaultItem {
            index,
            reason: problems.join("; "),
        });
    }

    serde_json::from_value(raw.clone()).map_err(|e| StorageError::InvalidDefaultItem {
        index,
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_datasets_are_valid() {
        for resource_type in ResourceType::ALL {
            let items = EmbeddedDefaults::for_type(resource_type)
                .default_items()
                .unwrap();
            assert!(!items.is_empty(), "{resource_type} has no defaults");
            for (index, raw) in items.iter().enumerate() {
                let item = validate_default_item(index, raw).unwrap();
                assert!(!item.name.is_empty());
            }
        }
    }

    #[test]
    fn test_valid_item() {
        let raw = json!({
            "name": "greeting",
            "version": "1.0.0",
            "createdBy": "system",
            "content": {"text": "hi"},
            "tags": ["starter"]
        });
        let item = validate_default_item(0, &raw).unwrap();
        assert_eq!(item.name, "greeting");
        assert_eq!(item.version.as_deref(), Some("1.0.0"));
        assert_eq!(item.tags, vec!["starter".to_string()]);
    }

    #[test]
    fn test_missing_required_fields_are_rejected() {
        for raw in [
            json!({"version": "1.0.0", "createdBy": "system"}),
            json!({"name": "greeting", "createdBy": "system"}),
            json!({"name": "greeting", "version": "1.0.0"}),
            json!({"name": "", "version": "1.0.0", "createdBy": "system"}),
            json!("not an object"),
        ] {
            let err = validate_default_item(3, &raw).unwrap_err();
            assert!(matches!(err, StorageError::InvalidDefaultItem { index: 3, .. }));
        }
    }

    #[test]
    fn test_bad_tags_are_rejected() {
        let raw = json!({
            "name": "greeting",
            "version": "1.0.0",
            "createdBy": "system",
            "tags": [1, 2]
        });
        assert!(validate_default_item(0, &raw).is_err());
    }

    #[test]
    fn test_unparseable_dataset_is_an_error() {
        assert!(EmbeddedDefaults::new("{not json").default_items().is_err());
        assert!(NoDefaults.default_items().unwrap().is_empty());
    }
}
