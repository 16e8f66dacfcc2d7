//! Server-status check: repair of local database copies marked OFFLINE

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info};

use crate::cluster::{ClusterDirectory, ClusterError, DbStatus};
use crate::metrics::metrics;

use super::cycle::panic_message;

/// Replication configuration a database copy is installed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationSource {
    pub database: String,
    /// Peer the copy is pulled from
    pub source_node: String,
    /// All peers currently serving the database
    pub servers: Vec<String>,
}

/// Installs a full copy of a database from a live peer
#[async_trait]
pub trait DatabaseInstaller: Send + Sync {
    /// Returns `Ok(true)` once the local copy is current
    async fn install_database_copy(
        &self,
        database: &str,
        source: &ReplicationSource,
    ) -> Result<bool, ClusterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No peer was ONLINE, the local copy was promoted
    PromotedLastCopy,
    /// Copy installed from `source` and set ONLINE
    Recovered { source: String },
    /// Install from `source` failed, status left OFFLINE
    Failed { source: String, reason: String },
}

/// Outcome of one recovery decision, only logged and returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryAttempt {
    pub database: String,
    pub outcome: RecoveryOutcome,
}

impl RecoveryAttempt {
    pub fn is_online(&self) -> bool {
        !matches!(self.outcome, RecoveryOutcome::Failed { .. })
    }
}

pub struct RecoveryCoordinator {
    directory: Arc<dyn ClusterDirectory>,
    installer: Arc<dyn DatabaseInstaller>,
}

impl RecoveryCoordinator {
    pub fn new(directory: Arc<dyn ClusterDirectory>, installer: Arc<dyn DatabaseInstaller>) -> Self {
        Self {
            directory,
            installer,
        }
    }

    /// Try to bring every OFFLINE local database back ONLINE
    ///
    /// Runs only on an ONLINE node. A failed or panicking install leaves the
    /// database OFFLINE until the next cycle and the remaining databases are
    /// still tried.
    pub async fn check_server_status(&self) -> Result<Vec<RecoveryAttempt>, ClusterError> {
        let dir = self.directory.as_ref();
        let local = dir.local_node_name();

        let node_status = dir.local_node_status()?;
        if !node_status.is_online() {
            debug!(local = %local, status = %node_status, "Node is not ONLINE, skipping recovery");
            return Ok(Vec::new());
        }

        let mut attempts = Vec::new();
        for database in dir.database_names()? {
            if dir.database_status(local, &database)? != Some(DbStatus::Offline) {
                continue;
            }

            let servers = dir.online_peers(&database)?;
            let outcome = match servers.first() {
                None => {
                    info!(
                        local = %local,
                        db = %database,
                        "No server is ONLINE for database. Considering local copy of database as the good one. Setting status=ONLINE"
                    );
                    dir.set_database_status(local, &database, DbStatus::Online)?;
                    metrics().record_recovery("promoted");
                    RecoveryOutcome::PromotedLastCopy
                }
                Some(first) => {
                    let source = ReplicationSource {
                        database: database.clone(),
                        source_node: first.clone(),
                        servers: servers.clone(),
                    };
                    self.install(&source).await?
                }
            };

            attempts.push(RecoveryAttempt { database, outcome });
        }

        Ok(attempts)
    }

    async fn install(&self, source: &ReplicationSource) -> Result<RecoveryOutcome, ClusterError> {
        let dir = self.directory.as_ref();
        let local = dir.local_node_name();
        let database = source.database.as_str();

        info!(
            local = %local,
            remote = %source.source_node,
            db = %database,
            "Trying to recover current server for database"
        );

        let installed = AssertUnwindSafe(self.installer.install_database_copy(database, source))
            .catch_unwind()
            .await;

        let failure = match installed {
            Ok(Ok(true)) => {
                dir.set_database_status(local, database, DbStatus::Online)?;
                info!(local = %local, db = %database, "Recover complete for database");
                metrics().record_recovery("recovered");
                return Ok(RecoveryOutcome::Recovered {
                    source: source.source_node.clone(),
                });
            }
            Ok(Ok(false)) => "install returned false".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("install panicked: {}", panic_message(panic.as_ref())),
        };

        info!(
            local = %local,
            db = %database,
            reason = %failure,
            "Recover cannot be completed for database"
        );
        metrics().record_recovery("failed");
        Ok(RecoveryOutcome::Failed {
            source: source.source_node.clone(),
            reason: failure,
        })
    }
}
