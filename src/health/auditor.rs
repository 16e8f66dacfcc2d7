//! Database-statuses check

use std::sync::Arc;

use tracing::warn;

use crate::cluster::{ClusterDirectory, ClusterError, StatusKey};
use crate::metrics::metrics;

/// Reports hosted databases that have no status entry for the local node
///
/// Read-only. A missing entry points at a component that failed to register
/// the status and is never read as OFFLINE.
pub struct StatusAuditor {
    directory: Arc<dyn ClusterDirectory>,
}

impl StatusAuditor {
    pub fn new(directory: Arc<dyn ClusterDirectory>) -> Self {
        Self { directory }
    }

    /// Returns the databases whose local entry is missing
    pub fn check_database_statuses(&self) -> Result<Vec<String>, ClusterError> {
        let dir = self.directory.as_ref();
        let local = dir.local_node_name();

        let mut missing = Vec::new();
        for database in dir.database_names()? {
            if dir.database_status(local, &database)?.is_none() {
                warn!(
                    local = %local,
                    db = %database,
                    key = %StatusKey::new(local, database.as_str()),
                    "Status of database on server is missing"
                );
                metrics().record_missing_status();
                missing.push(database);
            }
        }
        Ok(missing)
    }
}
