use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resource_store::{KeyValueStore, ObjectStoreKv, ResourceStores, StorageConfig, VersioningPolicy};
use serde_json::Value;
use shared_types::{OwnerScope, ResourceDraft, ResourceType};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

/// Inspect and edit versioned prompts, models, flows and LLM configs.
///
/// Storage is selected from the environment (STORAGE_BACKEND, STORAGE_PATH,
/// AWS_*), optionally loaded from a .env file.
#[derive(Debug, Parser)]
#[command(name = "resource-cli", version)]
struct Cli {
    /// Owner whose resources are addressed
    #[arg(long, env = "RESOURCE_OWNER", default_value = "default")]
    owner: String,

    /// Partition class: user or system
    #[arg(long, default_value = "user")]
    scope: OwnerScope,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Latest version of every resource of a type (seeds defaults on first use)
    List { resource_type: ResourceType },
    /// One resource, latest or a specific version
    Get {
        resource_type: ResourceType,
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Version history of a resource
    Versions {
        resource_type: ResourceType,
        name: String,
    },
    /// Save new content from a JSON file as a new version
    Put {
        resource_type: ResourceType,
        name: String,
        /// File holding the JSON content
        #[arg(long)]
        file: PathBuf,
        /// Label to use instead of a server-assigned one
        #[arg(long)]
        version: Option<String>,
        #[arg(long, default_value = "cli")]
        created_by: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete one version, or the whole resource without --version
    Delete {
        resource_type: ResourceType,
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Rename a resource, keeping its history
    Rename {
        resource_type: ResourceType,
        old_name: String,
        new_name: String,
    },
    /// Draw the next server-assigned version label
    NextVersion {
        resource_type: ResourceType,
        name: String,
    },
    /// Load the default dataset for every resource type the owner has none of
    Seed,
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, stores: ResourceStores) -> Result<()> {
    let owner = cli.owner.as_str();

    match cli.command {
        Command::List { resource_type } => {
            print_json(&stores.get(resource_type).get_all(owner).await?)?;
        }
        Command::Get {
            resource_type,
            name,
            version,
        } => {
            let object = stores
                .get(resource_type)
                .get_one(owner, &name, version.as_deref())
                .await?;
            match object {
                Some(object) => print_json(&object)?,
                None => anyhow::bail!("{} {} not found", resource_type, name),
            }
        }
        Command::Versions {
            resource_type,
            name,
        } => {
            print_json(&stores.get(resource_type).get_versions(owner, &name).await?)?;
        }
        Command::Put {
            resource_type,
            name,
            file,
            version,
            created_by,
            description,
            tags,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let content: Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;

            let mut draft = ResourceDraft::new(name, created_by, content).with_tags(tags);
            draft.version = version;
            draft.description = description;

            print_json(&stores.get(resource_type).save(owner, draft).await?)?;
        }
        Command::Delete {
            resource_type,
            name,
            version,
        } => {
            let deleted = stores
                .get(resource_type)
                .delete(owner, &name, version.as_deref())
                .await?;
            if !deleted {
                anyhow::bail!("{} {} not found", resource_type, name);
            }
            info!("Deleted {} {}", resource_type, name);
        }
        Command::Rename {
            resource_type,
            old_name,
            new_name,
        } => {
            match stores
                .get(resource_type)
                .rename(owner, &old_name, &new_name)
                .await?
            {
                Some(reference) => print_json(&reference)?,
                None => anyhow::bail!("{} {} not found", resource_type, old_name),
            }
        }
        Command::NextVersion {
            resource_type,
            name,
        } => {
            println!(
                "{}",
                stores.get(resource_type).get_next_version(owner, &name).await?
            );
        }
        Command::Seed => {
            for (resource_type, objects) in stores.ensure_seeded(owner).await? {
                println!("{resource_type}: {} resources", objects.len());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let storage_config = StorageConfig::from_env()?;
    let policy = VersioningPolicy::from_env()?;
    let kv: Arc<dyn KeyValueStore> = Arc::new(ObjectStoreKv::from_config(storage_config)?);
    let stores = ResourceStores::new(kv, cli.scope, policy);

    run(cli, stores).await
}
