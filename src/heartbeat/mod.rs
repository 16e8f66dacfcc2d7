//! Database-scoped heartbeat protocol
//!
//! A heartbeat is sent for one database to a set of peers. A response
//! proves the respondent is alive and still serves that database, so a peer
//! can be up and yet miss the heartbeat of a database it lost.

mod fanout;
mod loopback;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::cluster::ClusterError;

pub use fanout::{FanOutHeartbeat, PeerProbe};
pub use loopback::LoopbackProbe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub message_id: u64,
    pub database: String,
}

impl HeartbeatRequest {
    pub fn new(message_id: u64, database: impl Into<String>) -> Self {
        Self {
            message_id,
            database: database.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    /// Node that answered
    pub node: String,
    pub database: String,
    /// Id of the request being answered
    pub message_id: u64,
}

impl HeartbeatResponse {
    /// Build the acknowledgement `node` sends back for `request`
    pub fn ack(node: impl Into<String>, request: &HeartbeatRequest) -> Self {
        Self {
            node: node.into(),
            database: request.database.clone(),
            message_id: request.message_id,
        }
    }
}

/// Sends heartbeats and aggregates the answers
#[async_trait]
pub trait HeartbeatTransport: Send + Sync {
    /// Send a heartbeat for `database` to every peer and wait up to `timeout`
    ///
    /// Returns whatever answers arrived, keyed by peer. Fails with
    /// [`ClusterError::AllUnreachable`] when no peer answered at all.
    async fn send_heartbeat(
        &self,
        database: &str,
        peers: &[String],
        timeout: Duration,
    ) -> Result<HashMap<String, HeartbeatResponse>, ClusterError>;
}
