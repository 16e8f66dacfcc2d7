//! Server-in-stall check: heartbeat peers and demote the silent ones

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cluster::{ClusterDirectory, ClusterError, DbStatus};
use crate::config::HealthCheckConfig;
use crate::heartbeat::HeartbeatTransport;
use crate::metrics::metrics;

/// Result of applying the demotion policy to one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demotion {
    /// Peer's copy was set OFFLINE
    Demoted,
    /// Peer missed the heartbeat but configuration forbids demoting it
    Suppressed,
    /// Peer's copy was not ONLINE, nothing to do
    NotOnline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDemotion {
    pub database: String,
    pub peer: String,
    pub outcome: Demotion,
}

/// Decides what happens to a peer that missed a heartbeat
#[derive(Debug, Clone)]
pub struct DemotionPolicy {
    /// Whether this node may mark peers OFFLINE on its own
    pub can_offline_server: bool,
    /// Reported in the warning so operators see the window that elapsed
    pub heartbeat_timeout: Duration,
}

impl From<&HealthCheckConfig> for DemotionPolicy {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            can_offline_server: config.can_offline_server,
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}

impl DemotionPolicy {
    pub fn apply(
        &self,
        directory: &dyn ClusterDirectory,
        database: &str,
        peer: &str,
    ) -> Result<Demotion, ClusterError> {
        if directory.database_status(peer, database)? != Some(DbStatus::Online) {
            return Ok(Demotion::NotOnline);
        }

        let local = directory.local_node_name();
        let timeout_ms = self.heartbeat_timeout.as_millis() as u64;

        if self.can_offline_server {
            warn!(
                local = %local,
                remote = %peer,
                db = %database,
                timeout_ms,
                "Server did not respond to the heartbeat message. Setting the database as OFFLINE"
            );
            directory.set_database_status(peer, database, DbStatus::Offline)?;
            metrics().record_demotion("demoted");
            Ok(Demotion::Demoted)
        } else {
            warn!(
                local = %local,
                remote = %peer,
                db = %database,
                timeout_ms,
                "Server did not respond to the heartbeat message, but cannot be set OFFLINE by configuration"
            );
            metrics().record_demotion("suppressed");
            Ok(Demotion::Suppressed)
        }
    }
}

pub struct StallDetector {
    directory: Arc<dyn ClusterDirectory>,
    transport: Arc<dyn HeartbeatTransport>,
    policy: DemotionPolicy,
}

impl StallDetector {
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        transport: Arc<dyn HeartbeatTransport>,
        policy: DemotionPolicy,
    ) -> Self {
        Self {
            directory,
            transport,
            policy,
        }
    }

    /// Heartbeat every peer serving a local ONLINE database
    ///
    /// Runs only on an ONLINE node. When nobody answers at all the local node
    /// may be the isolated one, so no peer is demoted in that round.
    pub async fn check_server_in_stall(&self) -> Result<Vec<PeerDemotion>, ClusterError> {
        let dir = self.directory.as_ref();
        let local = dir.local_node_name();

        let node_status = dir.local_node_status()?;
        if !node_status.is_online() {
            debug!(local = %local, status = %node_status, "Node is not ONLINE, skipping stall check");
            return Ok(Vec::new());
        }

        let mut demotions = Vec::new();
        for database in dir.database_names()? {
            if dir.database_status(local, &database)? != Some(DbStatus::Online) {
                continue;
            }

            let servers = dir.online_peers(&database)?;
            if servers.is_empty() {
                continue;
            }

            debug!(
                local = %local,
                remote = ?servers,
                db = %database,
                "Sending heartbeat message to servers"
            );

            let responses = match self
                .transport
                .send_heartbeat(&database, &servers, self.policy.heartbeat_timeout)
                .await
            {
                Ok(responses) if !responses.is_empty() => responses,
                Ok(_) | Err(ClusterError::AllUnreachable { .. }) => {
                    debug!(
                        local = %local,
                        db = %database,
                        "No server responded to the heartbeat, the local server could be isolated"
                    );
                    metrics().record_heartbeat("unreachable");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let silent: Vec<&String> = servers
                .iter()
                .filter(|s| !responses.contains_key(s.as_str()))
                .collect();
            metrics().record_heartbeat(if silent.is_empty() { "complete" } else { "partial" });

            for peer in silent {
                let outcome = self.policy.apply(dir, &database, peer)?;
                demotions.push(PeerDemotion {
                    database: database.clone(),
                    peer: peer.clone(),
                    outcome,
                });
            }
        }

        Ok(demotions)
    }
}
