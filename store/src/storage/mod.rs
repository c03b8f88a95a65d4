mod backend;
mod config;
mod error;
mod traits;


pub use backend::ObjectStoreKv;
pub use config::StorageConfig;
pub use error::StorageError;
pub use traits::{KeyValueStore, StoreKey};
