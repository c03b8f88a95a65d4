use serde::{Deserialize, Serialize};

/// What to do when the atomic version counter cannot be incremented
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CounterFallback {
    /// Derive the label from the current time. Labels stay unique only
    /// while fallbacks for the same name do not land in the same millisecond.
    #[default]
    Timestamp,
    /// Fail the save with `StorageError::CounterUnavailable`
    Fail,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersioningPolicy {
    pub counter_fallback: CounterFallback,
}

impl VersioningPolicy {
    pub fn strict() -> Self {
        Self {
            counter_fallback: CounterFallback::Fail,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let fallback =
            std::env::var("VERSION_COUNTER_FALLBACK").unwrap_or_else(|_| "timestamp".to_string());

        let counter_fallback = match fallback.as_str() {
            "timestamp" => CounterFallback::Timestamp,
            "fail" => CounterFallback::Fail,
            _ => anyhow::bail!(
                "Unknown counter fallback: {}. Must be 'timestamp' or 'fail'",
                fallback
            ),
        };

        Ok(Self { counter_fallback })
    }
}
