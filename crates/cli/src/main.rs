use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use provschema_engine::{SchemaStore, StoreConfig, load_config, load_config_from_path, validate_config};
use provschema_types::{ProviderRequest, SchemaCategory};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Fetch provider plugin schemas from a provider registry.
#[derive(Debug, Parser)]
#[command(name = "provschema", version, about)]
struct Cli {
    /// Registry base URL, overriding the config file.
    #[arg(long, global = true, value_name = "URL")]
    registry: Option<String>,

    /// Path to the config file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ProviderArg {
    /// Provider address: namespace/name[@constraint]
    #[arg(value_name = "PROVIDER")]
    provider: ProviderRequest,
}

#[derive(Debug, Args)]
struct NamedArgs {
    #[command(flatten)]
    provider: ProviderArg,
    #[arg(value_name = "NAME")]
    name: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the full provider schema.
    Schema(ProviderArg),
    /// Print the provider configuration block.
    Provider(ProviderArg),
    /// Print one resource schema.
    Resource(NamedArgs),
    /// Print one data source schema.
    DataSource(NamedArgs),
    /// Print one function signature.
    Function(NamedArgs),
    /// Print one ephemeral resource schema.
    Ephemeral(NamedArgs),
    /// List the names in one schema category.
    List {
        #[command(flatten)]
        provider: ProviderArg,
        #[arg(value_enum)]
        category: Category,
    },
    /// List published versions, oldest first.
    Versions(ProviderArg),
    /// Resolve a version constraint to an exact version.
    Resolve {
        #[command(flatten)]
        provider: ProviderArg,
        #[arg(value_name = "CONSTRAINT")]
        constraint: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Category {
    Resources,
    DataSources,
    Functions,
    EphemeralResources,
}

impl From<Category> for SchemaCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Resources => SchemaCategory::Resource,
            Category::DataSources => SchemaCategory::DataSource,
            Category::Functions => SchemaCategory::Function,
            Category::EphemeralResources => SchemaCategory::EphemeralResource,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let store = SchemaStore::new(config).context("failed to create schema store")?;

    let result = run_command(&store, cli.command);
    let cleanup = store.cleanup().context("failed to remove temporary files");
    let output = result?;
    cleanup?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path).with_context(|| format!("failed to load {}", path.display()))?,
        None => load_config().context("failed to load config")?,
    };
    if let Some(registry) = &cli.registry {
        config.registry = registry.clone();
    }
    validate_config(&config).context("invalid configuration")?;
    debug!(registry = %config.registry, "configuration loaded");
    Ok(config)
}

fn run_command(store: &SchemaStore, command: Command) -> Result<serde_json::Value> {
    let value = match command {
        Command::Schema(arg) => {
            let request = arg.provider;
            let schema = store.schema(&request).with_context(|| format!("failed to fetch schema of {request}"))?;
            serde_json::to_value(schema.as_ref())?
        }
        Command::Provider(arg) => {
            let request = arg.provider;
            serde_json::to_value(store.provider_schema(&request)?)?
        }
        Command::Resource(args) => {
            let request = args.provider.provider;
            serde_json::to_value(store.resource_schema(&request, &args.name)?)?
        }
        Command::DataSource(args) => {
            let request = args.provider.provider;
            serde_json::to_value(store.data_source_schema(&request, &args.name)?)?
        }
        Command::Function(args) => {
            let request = args.provider.provider;
            serde_json::to_value(store.function_signature(&request, &args.name)?)?
        }
        Command::Ephemeral(args) => {
            let request = args.provider.provider;
            serde_json::to_value(store.ephemeral_resource_schema(&request, &args.name)?)?
        }
        Command::List { provider, category } => {
            let request = provider.provider;
            json!(store.names(&request, category.into())?)
        }
        Command::Versions(arg) => {
            let request = arg.provider;
            let versions = store.available_versions(&request.versions_request())?;
            json!(versions.iter().map(ToString::to_string).collect::<Vec<_>>())
        }
        Command::Resolve { provider, constraint } => {
            let request = provider.provider.with_version(constraint);
            let resolved = store.resolve(&request)?;
            json!({
                "namespace": resolved.namespace,
                "name": resolved.name,
                "constraint": request.version,
                "version": resolved.version,
            })
        }
    };
    Ok(value)
}
