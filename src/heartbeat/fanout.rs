//! Bounded-time fan-out/fan-in heartbeat transport

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::cluster::ClusterError;

use super::{HeartbeatRequest, HeartbeatResponse, HeartbeatTransport};

/// Delivers one heartbeat request to one peer
#[async_trait]
pub trait PeerProbe: Send + Sync {
    async fn probe(
        &self,
        peer: &str,
        request: &HeartbeatRequest,
    ) -> Result<HeartbeatResponse, ClusterError>;
}

/// Dispatches a heartbeat to all peers concurrently
///
/// Responses are collected as they arrive. When the window elapses the map
/// collected so far is returned as-is; only an empty map is an error.
pub struct FanOutHeartbeat<P> {
    probe: P,
    message_ids: AtomicU64,
}

impl<P: PeerProbe> FanOutHeartbeat<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            message_ids: AtomicU64::new(1),
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    fn next_message_id(&self) -> u64 {
        self.message_ids.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl<P: PeerProbe> HeartbeatTransport for FanOutHeartbeat<P> {
    async fn send_heartbeat(
        &self,
        database: &str,
        peers: &[String],
        timeout: Duration,
    ) -> Result<HashMap<String, HeartbeatResponse>, ClusterError> {
        let request = HeartbeatRequest::new(self.next_message_id(), database);
        let deadline = tokio::time::Instant::now() + timeout;

        let mut pending: FuturesUnordered<_> = peers
            .iter()
            .map(|peer| {
                let request = &request;
                let probe = &self.probe;
                async move { (peer.as_str(), probe.probe(peer, request).await) }
            })
            .collect();

        let mut responses = HashMap::with_capacity(peers.len());

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((peer, Ok(response)))) => {
                    if response.database != request.database
                        || response.message_id != request.message_id
                    {
                        debug!(
                            remote = %peer,
                            db = %database,
                            message_id = response.message_id,
                            "Ignoring heartbeat response for another request"
                        );
                        continue;
                    }
                    responses.insert(peer.to_string(), response);
                }
                Ok(Some((_, Err(ClusterError::TransportClosed)))) => {
                    return Err(ClusterError::TransportClosed);
                }
                Ok(Some((peer, Err(e)))) => {
                    debug!(remote = %peer, db = %database, error = %e, "Heartbeat failed");
                }
                Ok(None) => break,
                Err(_) => {
                    debug!(
                        db = %database,
                        outstanding = pending.len(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Heartbeat window elapsed"
                    );
                    break;
                }
            }
        }

        if responses.is_empty() {
            return Err(ClusterError::AllUnreachable {
                database: database.to_string(),
            });
        }
        Ok(responses)
    }
}
