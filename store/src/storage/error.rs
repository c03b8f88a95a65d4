use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Version counter unavailable for {key}: {reason}")]
    CounterUnavailable { key: String, reason: String },

    #[error("Invalid default item #{index}: {reason}")]
    InvalidDefaultItem { index: usize, reason: String },

    #[error("Malformed item at {key}: {reason}")]
    MalformedItem { key: String, reason: String },

    #[error("Could not assign a free version label for {name} after {attempts} draws")]
    LabelExhausted { name: String, attempts: usize },
}
