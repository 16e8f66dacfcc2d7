//! In-process cluster directory
//!
//! Backs the standalone binary and the tests. Keeps membership order so that
//! `online_nodes` is deterministic, and can be closed to emulate a membership
//! layer that is shutting down.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::{ClusterDirectory, ClusterError, DbStatus, NodeStatus, StatusKey};

pub struct InMemoryDirectory {
    local_node: String,
    /// Members in join order (name, status)
    nodes: RwLock<Vec<(String, NodeStatus)>>,
    /// Databases hosted by the local node, in registration order
    databases: RwLock<Vec<String>>,
    statuses: DashMap<StatusKey, DbStatus>,
    closed: AtomicBool,
    status_writes: AtomicU64,
}

impl InMemoryDirectory {
    /// Create a directory containing only the local node in `status`
    pub fn new(local_node: impl Into<String>, status: NodeStatus) -> Self {
        let local_node = local_node.into();
        Self {
            nodes: RwLock::new(vec![(local_node.clone(), status)]),
            local_node,
            databases: RwLock::new(Vec::new()),
            statuses: DashMap::new(),
            closed: AtomicBool::new(false),
            status_writes: AtomicU64::new(0),
        }
    }

    /// Add a member, or update its status if already known
    pub fn add_node(&self, name: impl Into<String>, status: NodeStatus) {
        let name = name.into();
        let mut nodes = self.nodes.write();
        match nodes.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = status,
            None => nodes.push((name, status)),
        }
    }

    pub fn set_node_status(&self, name: &str, status: NodeStatus) {
        self.add_node(name, status);
    }

    /// Register a database as hosted by the local node
    pub fn host_database(&self, database: impl Into<String>) {
        let database = database.into();
        let mut databases = self.databases.write();
        if !databases.contains(&database) {
            databases.push(database);
        }
    }

    /// Drop a status entry entirely
    pub fn remove_status(&self, node: &str, database: &str) {
        self.statuses.remove(&StatusKey::new(node, database));
    }

    /// Make every subsequent call fail with `TransportClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of status upserts applied so far
    pub fn status_writes(&self) -> u64 {
        self.status_writes.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<(), ClusterError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ClusterError::TransportClosed)
        } else {
            Ok(())
        }
    }
}

impl ClusterDirectory for InMemoryDirectory {
    fn local_node_name(&self) -> &str {
        &self.local_node
    }

    fn local_node_status(&self) -> Result<NodeStatus, ClusterError> {
        self.ensure_open()?;
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .find(|(n, _)| *n == self.local_node)
            .map(|(_, s)| *s)
            .unwrap_or(NodeStatus::Offline))
    }

    fn database_names(&self) -> Result<Vec<String>, ClusterError> {
        self.ensure_open()?;
        Ok(self.databases.read().clone())
    }

    fn database_status(
        &self,
        node: &str,
        database: &str,
    ) -> Result<Option<DbStatus>, ClusterError> {
        self.ensure_open()?;
        Ok(self
            .statuses
            .get(&StatusKey::new(node, database))
            .map(|r| *r.value()))
    }

    fn set_database_status(
        &self,
        node: &str,
        database: &str,
        status: DbStatus,
    ) -> Result<(), ClusterError> {
        self.ensure_open()?;
        let key = StatusKey::new(node, database);
        debug!(key = %key, status = %status, "Updating database status");
        self.statuses.insert(key, status);
        self.status_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn online_nodes(&self, database: &str) -> Result<Vec<String>, ClusterError> {
        self.ensure_open()?;
        let nodes = self.nodes.read();
        Ok(nodes
            .iter()
            .filter(|(name, _)| {
                self.statuses
                    .get(&StatusKey::new(name.as_str(), database))
                    .map(|r| *r.value() == DbStatus::Online)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.clone())
            .collect())
    }
}
