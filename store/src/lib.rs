#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod repository;
pub mod resources;
pub mod storage;
pub mod versioned;

pub use repository::ItemRepository;
pub use resources::{DefaultSource, EmbeddedDefaults, NoDefaults, ResourceStores};
pub use storage::{KeyValueStore, ObjectStoreKv, StorageConfig, StorageError, StoreKey};
pub use versioned::{CounterFallback, VersionedResourceStore, VersioningPolicy};
