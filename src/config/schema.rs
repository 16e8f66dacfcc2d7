use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Identity of the local node
    #[serde(default)]
    pub node: NodeConfig,
    /// Health check configuration
    #[serde(default)]
    pub health: HealthCheckConfig,
    /// Prometheus endpoint
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Databases and peers seeded into the in-memory directory
    #[serde(default)]
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Unique node name within the cluster
    #[serde(default = "default_node_name")]
    pub name: String,
}

fn default_node_name() -> String {
    "node-1".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_node_name(),
        }
    }
}

// ============================================================================
// Health Check Configuration
// ============================================================================

/// Cluster health check configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HealthCheckConfig {
    /// Whether the periodic health check runs at all
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Interval between health check cycles (milliseconds)
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Bound on waiting for heartbeat responses (milliseconds)
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Whether peers that miss a heartbeat may be marked OFFLINE by this node
    #[serde(default)]
    pub can_offline_server: bool,
}

fn default_health_enabled() -> bool {
    true
}

fn default_check_interval_ms() -> u64 {
    10_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            check_interval_ms: default_check_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            can_offline_server: false,
        }
    }
}

impl HealthCheckConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

// ============================================================================
// Metrics Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,
}

fn default_metrics_addr() -> String {
    "127.0.0.1:9464".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_addr(),
        }
    }
}

// ============================================================================
// Cluster Seed Configuration
// ============================================================================

/// Standalone cluster layout
///
/// Every listed database is hosted by the local node and by every peer.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClusterConfig {
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    /// Whether the peer answers heartbeats
    #[serde(default = "default_peer_reachable")]
    pub reachable: bool,
}

fn default_peer_reachable() -> bool {
    true
}
