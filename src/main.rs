use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use replica_health::cluster::{ClusterDirectory, ClusterError, DbStatus, InMemoryDirectory, NodeStatus};
use replica_health::config::{self, Config};
use replica_health::health::{DatabaseInstaller, HealthCheckCycle, ReplicationSource};
use replica_health::heartbeat::{FanOutHeartbeat, LoopbackProbe};
use replica_health::metrics;

/// Standalone installer: a copy can be pulled from any peer that answers heartbeats
struct LoopbackInstaller {
    transport: Arc<FanOutHeartbeat<LoopbackProbe>>,
}

#[async_trait]
impl DatabaseInstaller for LoopbackInstaller {
    async fn install_database_copy(
        &self,
        database: &str,
        source: &ReplicationSource,
    ) -> Result<bool, ClusterError> {
        let reachable = self.transport.probe().is_reachable(&source.source_node);
        info!(db = %database, remote = %source.source_node, reachable, "Installing database copy");
        Ok(reachable)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_or_default_config();

    let probe = LoopbackProbe::new();
    for peer in &config.cluster.peers {
        probe.set_reachable(&peer.name, peer.reachable);
    }
    let transport = Arc::new(FanOutHeartbeat::new(probe));
    let directory = Arc::new(build_directory(&config)?);
    let installer = Arc::new(LoopbackInstaller {
        transport: transport.clone(),
    });

    let shutdown = CancellationToken::new();

    if config.metrics.enabled {
        let addr = config.metrics.listen_addr.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(&addr, shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        });
    }

    info!(
        node = %config.node.name,
        databases = config.cluster.databases.len(),
        peers = config.cluster.peers.len(),
        "Replica health monitor starting"
    );

    let cycle = Arc::new(HealthCheckCycle::new(
        directory,
        transport,
        installer,
        config.health.clone(),
    ));
    let handle = cycle.start(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown.cancel();
    handle.await?;

    Ok(())
}

/// Seed the in-memory directory: peers start ONLINE, the local copies
/// start OFFLINE and are brought up by the health loop
fn build_directory(config: &Config) -> Result<InMemoryDirectory, ClusterError> {
    let local = config.node.name.as_str();
    let directory = InMemoryDirectory::new(local, NodeStatus::Online);
    for peer in &config.cluster.peers {
        directory.add_node(peer.name.as_str(), NodeStatus::Online);
    }
    for database in &config.cluster.databases {
        directory.host_database(database.as_str());
        directory.set_database_status(local, database, DbStatus::Offline)?;
        for peer in &config.cluster.peers {
            directory.set_database_status(&peer.name, database, DbStatus::Online)?;
        }
    }
    Ok(directory)
}

fn load_or_default_config() -> Config {
    // Try to load from config file
    let config_paths = ["config/replica-health.toml", "replica-health.toml"];

    for path in config_paths {
        match config::load_config(path) {
            Ok(config) => {
                info!(path = path, "Loaded configuration");
                return config;
            }
            Err(e) => {
                warn!(path = path, error = %e, "Failed to load config");
            }
        }
    }

    info!("Using default configuration");
    Config::default()
}
