//! azure-provider: offline planner for the cloud provider.
//!
//! Runs one provider operation against a resource group snapshot held in
//! memory and prints the writes it would issue:
//! - load balancer ensure / delete / status for a service
//! - route list / create / delete for a node
//! - instance and zone lookups

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use azure_provider::cluster::{ClusterRoute, Service};
use azure_provider::naming::ResourceNamer;
use azure_provider::{AzureProvider, CloudConfig, CloudSnapshot, MemoryCloud, MetadataFile};

/// Cloud provider planner
#[derive(Parser, Debug)]
#[command(name = "azure-provider", version, about)]
struct Args {
    /// Provider config (JSON)
    #[arg(short, long, default_value = "/etc/kubernetes/azure.json")]
    config: PathBuf,

    /// Resource group snapshot (JSON). Starts empty when the file is missing.
    #[arg(short, long)]
    state: PathBuf,

    /// Write the resulting snapshot back to --state
    #[arg(long)]
    save: bool,

    /// Cluster name
    #[arg(long, default_value = "kubernetes")]
    cluster: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expose a service through the cluster load balancer
    EnsureLb {
        /// Service (JSON)
        #[arg(long)]
        service: PathBuf,

        /// Hosts to join to the backend pool
        #[arg(long = "host")]
        hosts: Vec<String>,
    },
    /// Remove a service from the cluster load balancer
    DeleteLb {
        /// Service (JSON)
        #[arg(long)]
        service: PathBuf,
    },
    /// Show the ingress address of a service
    LbStatus {
        /// Service (JSON)
        #[arg(long)]
        service: PathBuf,
    },
    /// List routes of the cluster route table
    ListRoutes,
    /// Route a pod CIDR to a node
    CreateRoute {
        /// Target node
        #[arg(long)]
        instance: String,

        /// Destination CIDR
        #[arg(long)]
        cidr: String,

        #[arg(long, default_value = "")]
        name_hint: String,
    },
    /// Delete the route of a node
    DeleteRoute {
        /// Target node
        #[arg(long)]
        instance: String,
    },
    /// Show addresses, ID and size of a node
    Instance {
        /// Node name
        name: String,
    },
    /// Show the zone of this host
    Zone {
        /// Instance metadata document (JSON)
        #[arg(long)]
        metadata: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "azure_provider=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = CloudConfig::from_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    info!(
        "Resource group {} in {} ({})",
        config.resource_group,
        config.location,
        config.environment().resource_manager_endpoint()
    );

    let snapshot = load_snapshot(&args.state).await?;
    let namer = ResourceNamer::new(&config.subscription_id, &config.resource_group);
    let cloud = Arc::new(MemoryCloud::with_snapshot(namer, snapshot));
    let mut provider = AzureProvider::new(Arc::clone(&cloud), config);

    let cluster = args.cluster.as_str();
    match args.command {
        Commands::EnsureLb { service, hosts } => {
            let service = load_service(&service).await?;
            let status = provider.ensure_load_balancer(cluster, &service, &hosts).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::DeleteLb { service } => {
            let service = load_service(&service).await?;
            provider.ensure_load_balancer_deleted(cluster, &service).await?;
        }
        Commands::LbStatus { service } => {
            let service = load_service(&service).await?;
            match provider.get_load_balancer(cluster, &service).await? {
                Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
                None => println!("{}: no load balancer", service),
            }
        }
        Commands::ListRoutes => {
            for route in provider.list_routes(cluster).await? {
                println!("{}\t{}", route.target_instance, route.destination_cidr);
            }
        }
        Commands::CreateRoute {
            instance,
            cidr,
            name_hint,
        } => {
            let route = ClusterRoute {
                name: String::new(),
                target_instance: instance,
                destination_cidr: cidr,
            };
            provider.create_route(cluster, &name_hint, &route).await?;
        }
        Commands::DeleteRoute { instance } => {
            let route = ClusterRoute {
                name: String::new(),
                target_instance: instance,
                destination_cidr: String::new(),
            };
            provider.delete_route(cluster, &route).await?;
        }
        Commands::Instance { name } => {
            println!("id:   {}", provider.instance_id(&name).await?);
            println!("type: {}", provider.instance_type(&name).await?);
            for address in provider.node_addresses(&name).await? {
                println!("{:?}: {}", address.kind, address.address);
            }
        }
        Commands::Zone { metadata } => {
            provider = provider.with_metadata(Arc::new(MetadataFile::new(metadata)));
            let zone = provider.get_zone().await?;
            println!("{}", serde_json::to_string_pretty(&zone)?);
        }
    }

    let journal = cloud.journal();
    if journal.is_empty() {
        println!("no changes");
    }
    for write in &journal {
        println!("{}", write);
    }

    if args.save {
        let json = cloud.snapshot().to_json()?;
        tokio::fs::write(&args.state, json)
            .await
            .with_context(|| format!("saving snapshot {}", args.state.display()))?;
        info!("Snapshot saved to {}", args.state.display());
    }

    Ok(())
}

async fn load_snapshot(path: &Path) -> Result<CloudSnapshot> {
    if !tokio::fs::try_exists(path).await? {
        info!("No snapshot at {}, starting empty", path.display());
        return Ok(CloudSnapshot::default());
    }
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    CloudSnapshot::from_json(&json).with_context(|| format!("parsing snapshot {}", path.display()))
}

async fn load_service(path: &Path) -> Result<Service> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading service {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing service {}", path.display()))
}
