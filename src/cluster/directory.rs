use super::{ClusterError, DbStatus, NodeStatus};

/// Read/write view of the cluster membership and database status map
///
/// Every call may fail with [`ClusterError::TransportClosed`] once the
/// underlying membership layer starts shutting down.
pub trait ClusterDirectory: Send + Sync {
    /// Name of the node this directory is running on
    fn local_node_name(&self) -> &str;

    /// Membership status of the local node
    fn local_node_status(&self) -> Result<NodeStatus, ClusterError>;

    /// Databases hosted by the local node
    fn database_names(&self) -> Result<Vec<String>, ClusterError>;

    /// Status of `database` on `node`, `None` when no entry was ever written
    fn database_status(&self, node: &str, database: &str)
        -> Result<Option<DbStatus>, ClusterError>;

    /// Upsert the status of `database` on `node`
    fn set_database_status(
        &self,
        node: &str,
        database: &str,
        status: DbStatus,
    ) -> Result<(), ClusterError>;

    /// Nodes whose copy of `database` is ONLINE, in membership order
    ///
    /// The local node is included when its own copy is ONLINE.
    fn online_nodes(&self, database: &str) -> Result<Vec<String>, ClusterError>;

    /// Same as [`online_nodes`](Self::online_nodes) without the local node
    fn online_peers(&self, database: &str) -> Result<Vec<String>, ClusterError> {
        let local = self.local_node_name();
        let mut nodes = self.online_nodes(database)?;
        nodes.retain(|n| n != local);
        Ok(nodes)
    }
}
