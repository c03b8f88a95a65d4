#![allow(clippy::unwrap_used)]

use anyhow::Result;
use resource_store::{
    ItemRepository, KeyValueStore, NoDefaults, ObjectStoreKv, StorageConfig,
    VersionedResourceStore,
};
use serde_json::json;
use shared_types::{OwnerScope, ResourceDraft, ResourceType};
use std::sync::Arc;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;

// ============================================================================
// S3 Storage Tests (need a local Docker daemon)
// ============================================================================

async fn setup_minio_with_bucket() -> Result<(ContainerAsync<MinIO>, String)> {
    let container = MinIO::default()
        .with_env_var("MINIO_ROOT_USER", "minioadmin")
        .with_env_var("MINIO_ROOT_PASSWORD", "minioadmin")
        .start()
        .await?;

    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(9000).await?;
    let endpoint = format!("http://{}:{}", host, port);

    // Wait for MinIO to be ready
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    use aws_config::BehaviorVersion;
    use aws_sdk_s3::config::{Credentials, Region};

    let creds = Credentials::new("minioadmin", "minioadmin", None, None, "test");
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .endpoint_url(&endpoint)
        .credentials_provider(creds)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
        .create_bucket()
        .bucket("test-bucket")
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create bucket: {}", e))?;

    Ok((container, endpoint))
}

fn s3_store(endpoint: String) -> Result<VersionedResourceStore> {
    let config = StorageConfig::s3(
        "test-bucket",
        Some("us-east-1".to_string()),
        Some(endpoint),
        Some("minioadmin".to_string()),
        Some("minioadmin".to_string()),
        true,
    );
    let kv: Arc<dyn KeyValueStore> = Arc::new(ObjectStoreKv::from_config(config)?);
    Ok(VersionedResourceStore::new(
        ItemRepository::new(kv, OwnerScope::User),
        ResourceType::Model,
        Arc::new(NoDefaults),
    ))
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_s3_versioning() -> Result<()> {
    let (_container, endpoint) = setup_minio_with_bucket().await?;
    let store = s3_store(endpoint)?;

    for i in 1..=5 {
        store
            .save(
                "u1",
                ResourceDraft::new("router", "u1", json!({ "revision": i })),
            )
            .await?;
    }

    let reference = store.get_versions("u1", "router").await?;
    assert_eq!(reference.versions_count, 5);
    assert_eq!(reference.latest_version, "1.0.5");

    let third = store.get_one("u1", "router", Some("1.0.3")).await?.unwrap();
    assert_eq!(third.content["revision"], 3);

    assert!(store.delete("u1", "router", Some("1.0.5")).await?);
    let latest = store.get_one("u1", "router", None).await?.unwrap();
    assert_eq!(latest.version, "1.0.4");
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_s3_rename_and_list() -> Result<()> {
    let (_container, endpoint) = setup_minio_with_bucket().await?;
    let store = s3_store(endpoint)?;

    store
        .save("u1", ResourceDraft::new("alpha", "u1", json!({"n": 1})))
        .await?;
    store
        .save("u1", ResourceDraft::new("beta", "u1", json!({"n": 2})))
        .await?;
    store.rename("u1", "alpha", "gamma").await?.unwrap();

    let mut revisions: Vec<_> = store
        .get_all("u1")
        .await?
        .into_iter()
        .map(|o| o.content["n"].as_i64().unwrap())
        .collect();
    revisions.sort_unstable();
    assert_eq!(revisions, vec![1, 2]);
    assert!(store.get_one("u1", "alpha", None).await?.is_none());
    assert!(store.get_one("u1", "gamma", None).await?.is_some());
    Ok(())
}
