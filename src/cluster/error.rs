/// Errors raised by the cluster collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The coordination substrate is shutting down
    #[error("Cluster transport is not active")]
    TransportClosed,
    /// A request reached none of its target servers
    #[error("No server responded to the request (db={database})")]
    AllUnreachable { database: String },
    #[error("Install of database '{database}' failed: {reason}")]
    Install { database: String, reason: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Check panicked: {0}")]
    Panicked(String),
}

impl ClusterError {
    pub fn is_transport_closed(&self) -> bool {
        matches!(self, Self::TransportClosed)
    }
}
