mod cluster;

use clap::{Parser, Subcommand};
use cluster::{is_pending, ClusterState};
use limitspread_core::{Resource, ResourceName};
use limitspread_scheduler::config::DEFAULT_CONFIG_PATH;
use limitspread_scheduler::{
    FitLimitResources, Framework, FrameworkHandle, InMemoryOwnerClient, PriorityConfig,
    ResourceWeights, SPPriority, Snapshot,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "limitspread", about = "Limit-aware fit and spread scoring for pod placement")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score, bind and record one pending pod from a cluster file
    Schedule {
        /// Cluster file with nodes, pods and replicaSets
        #[arg(long)]
        cluster: PathBuf,
        /// Name of the pending pod
        #[arg(long)]
        pod: String,
        /// Namespace of the pending pod
        #[arg(long, default_value = "default")]
        namespace: String,
        /// Spread priority configuration file
        #[arg(long, env = "LIMITSPREAD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Weight of the CPU dimension in the fit score
        #[arg(long, default_value_t = 1)]
        cpu_weight: i64,
        /// Weight of the memory dimension in the fit score
        #[arg(long, default_value_t = 1)]
        memory_weight: i64,
        /// Write the binding and the updated schedule state back to the cluster file
        #[arg(long)]
        write: bool,
    },
    /// Print the effective spread priority configuration
    Config {
        /// Spread priority configuration file
        #[arg(long, env = "LIMITSPREAD_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schedule {
            cluster,
            pod,
            namespace,
            config,
            cpu_weight,
            memory_weight,
            write,
        } => {
            let weights = ResourceWeights::new([
                (ResourceName::Cpu, cpu_weight),
                (ResourceName::Memory, memory_weight),
            ]);
            run_schedule(&cluster, &namespace, &pod, &config, weights, write).await
        }
        Commands::Config { config } => run_config(&config),
    }
}

/// Run one scheduling cycle for `namespace/pod_name`
async fn run_schedule(
    cluster_path: &Path,
    namespace: &str,
    pod_name: &str,
    config_path: &Path,
    weights: ResourceWeights,
    write: bool,
) -> miette::Result<()> {
    let config = PriorityConfig::load_from(config_path)?;
    let mut cluster = ClusterState::load(cluster_path).await?;

    let index = cluster
        .find_pod(namespace, pod_name)
        .ok_or_else(|| miette::miette!("Pod {}/{} not found in cluster file", namespace, pod_name))?;
    let mut pod = cluster.pods[index].clone();
    if !is_pending(&pod) {
        return Err(miette::miette!(
            "Pod {} is already bound",
            pod.display_name()
        ));
    }

    let snapshot = Snapshot::new(cluster.nodes.clone(), cluster.pods.clone());
    let node_names = snapshot.node_names();
    if node_names.is_empty() {
        return Err(miette::miette!("Cluster file has no nodes"));
    }

    let owner_client = InMemoryOwnerClient::new(cluster.replica_sets.clone());
    let handle = FrameworkHandle::new()
        .with_snapshot(Arc::new(snapshot))
        .with_owner_client(Arc::new(owner_client.clone()));

    let framework = Framework::new()
        .with_plugin(Arc::new(FitLimitResources::new(&handle, weights)?), 1)
        .with_plugin(Arc::new(SPPriority::new(&handle, config)?), 1);

    let (best, scores) = framework.schedule(&pod, &node_names).await?;

    for score in &scores {
        println!("{:<32} {:>5}", score.name, score.score);
    }
    println!("selected: {}", best.name);

    if let Some(spec) = pod.spec.as_mut() {
        spec.node_name = Some(best.name.clone());
    }
    framework.run_post_bind(&pod, &best.name).await;

    if write {
        cluster.pods[index] = pod;
        cluster.replica_sets = owner_client.replica_sets().await;
        cluster.save(cluster_path).await?;
        info!("Wrote updated cluster state to {}", cluster_path.display());
    }

    Ok(())
}

/// Print the effective configuration as YAML
fn run_config(config_path: &Path) -> miette::Result<()> {
    let config = PriorityConfig::load_from(config_path)?;
    let yaml = limitspread_core::to_yaml(&config)?;
    print!("{}", yaml);
    Ok(())
}
