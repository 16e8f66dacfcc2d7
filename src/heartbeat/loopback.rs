//! In-process peer probe
//!
//! Reachable peers acknowledge immediately (after an optional latency).
//! Unreachable peers never answer, so the caller's deadline decides.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cluster::ClusterError;

use super::{HeartbeatRequest, HeartbeatResponse, PeerProbe};

#[derive(Debug, Default)]
pub struct LoopbackProbe {
    unreachable: RwLock<HashSet<String>>,
    latency: Duration,
}

impl LoopbackProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            unreachable: RwLock::new(HashSet::new()),
            latency,
        }
    }

    pub fn set_reachable(&self, peer: &str, reachable: bool) {
        let mut unreachable = self.unreachable.write();
        if reachable {
            unreachable.remove(peer);
        } else {
            unreachable.insert(peer.to_string());
        }
    }

    pub fn is_reachable(&self, peer: &str) -> bool {
        !self.unreachable.read().contains(peer)
    }
}

#[async_trait]
impl PeerProbe for LoopbackProbe {
    async fn probe(
        &self,
        peer: &str,
        request: &HeartbeatRequest,
    ) -> Result<HeartbeatResponse, ClusterError> {
        if !self.is_reachable(peer) {
            std::future::pending::<()>().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(HeartbeatResponse::ack(peer, request))
    }
}
