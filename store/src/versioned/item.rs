use serde::{Deserialize, Serialize};
use shared_types::{Reference, ResourceType, VersionedObject};
use std::fmt::Write;

/// Everything the versioned layer writes into an owner partition.
/// The `kind` tag is what separates references from content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum StoredItem {
    Reference(Reference),
    Object(VersionedObject),
}

impl StoredItem {
    pub(crate) fn into_reference(self) -> Option<Reference> {
        match self {
            StoredItem::Reference(reference) => Some(reference),
            StoredItem::Object(_) => None,
        }
    }

    pub(crate) fn into_object(self) -> Option<VersionedObject> {
        match self {
            StoredItem::Object(object) => Some(object),
            StoredItem::Reference(_) => None,
        }
    }
}

pub(crate) fn reference_prefix(resource_type: ResourceType) -> String {
    format!("ref#{resource_type}#")
}

pub(crate) fn reference_id(resource_type: ResourceType, name: &str) -> String {
    format!("ref#{resource_type}#{}", name.trim())
}

/// Version labels are compared exactly, but item ids are normalized on the
/// way into the store, so the label is escaped into a form normalization
/// leaves untouched: `RC1` and `rc1` must not share a key.
pub(crate) fn content_id(resource_type: ResourceType, reference_id: &str, version: &str) -> String {
    format!("{resource_type}#{reference_id}#{}", escape_label(version))
}

fn escape_label(version: &str) -> String {
    let mut escaped = String::with_capacity(version.len());
    for byte in version.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' => escaped.push(char::from(byte)),
            _ => {
                let _ = write!(escaped, "%{byte:02x}");
            }
        }
    }
    escaped
}

pub(crate) fn counter_id(resource_type: ResourceType, name: &str) -> String {
    format!("{resource_type}#latest#{}", name.trim())
}
