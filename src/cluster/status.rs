//! Node and database status definitions

use std::fmt;

/// Membership status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Node is joining and not yet trusted for repairs
    Starting,
    /// Node is a full cluster member
    Online,
    /// Node left or was cut off
    Offline,
    /// Node was removed from the cluster configuration
    Removed,
}

impl NodeStatus {
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "STARTING",
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Removed => "REMOVED",
        };
        f.write_str(s)
    }
}

/// Availability of one database copy on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbStatus {
    /// Copy is current and serves reads
    Online,
    /// Copy is stale or unreachable
    Offline,
    /// Copy is being installed from a peer
    Synchronizing,
    /// Copy is being backed up
    Backup,
}

impl fmt::Display for DbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Synchronizing => "SYNCHRONIZING",
            Self::Backup => "BACKUP",
        };
        f.write_str(s)
    }
}

/// Composite key of the replicated status map
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusKey {
    pub node: String,
    pub database: String,
}

impl StatusKey {
    pub fn new(node: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            database: database.into(),
        }
    }
}

/// Renders as the configuration-map key, `dbstatus.<node>.<database>`
impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dbstatus.{}.{}", self.node, self.database)
    }
}
