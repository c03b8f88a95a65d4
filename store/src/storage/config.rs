use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_BACKEND: &str = "local";
const DEFAULT_LOCAL_PATH: &str = "./data";

/// Where the key/value items live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageConfig {
    Local {
        path: PathBuf,
    },
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        allow_http: bool,
    },
    /// Process-local, lost on exit
    Memory,
}

impl StorageConfig {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    pub fn s3(
        bucket: impl Into<String>,
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        allow_http: bool,
    ) -> Self {
        Self::S3 {
            bucket: bucket.into(),
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            allow_http,
        }
    }

    pub fn memory() -> Self {
        Self::Memory
    }

    /// Read `STORAGE_BACKEND` (`local`, `s3` or `memory`) and the variables
    /// that backend needs
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = var("STORAGE_BACKEND").unwrap_or_else(|| DEFAULT_BACKEND.to_string());

        match backend.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::local(
                var("STORAGE_PATH").unwrap_or_else(|| DEFAULT_LOCAL_PATH.to_string()),
            )),
            "memory" => Ok(Self::memory()),
            "s3" => {
                let Some(bucket) = var("AWS_BUCKET") else {
                    bail!("STORAGE_BACKEND=s3 needs AWS_BUCKET");
                };
                let allow_http = match var("AWS_ALLOW_HTTP") {
                    Some(raw) => raw
                        .parse::<bool>()
                        .with_context(|| format!("AWS_ALLOW_HTTP={raw} is not true or false"))?,
                    None => false,
                };

                Ok(Self::S3 {
                    bucket,
                    region: var("AWS_REGION"),
                    endpoint: var("AWS_ENDPOINT"),
                    access_key_id: var("AWS_ACCESS_KEY_ID"),
                    secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
                    allow_http,
                })
            }
            other => bail!("STORAGE_BACKEND={other} is not one of local, s3, memory"),
        }
    }
}
