//! Full health check cycle scenarios

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use replica_health::cluster::{
    ClusterDirectory, ClusterError, DbStatus, InMemoryDirectory, NodeStatus,
};
use replica_health::health::{CycleOutcome, HealthCheckCycle};

use crate::{cluster, health_config, seed, status, RecordingInstaller, ScriptedHeartbeat, LOCAL};

/// Fails the first `local_node_status` call with a fixed error
struct FirstCallFails {
    inner: Arc<InMemoryDirectory>,
    error: ClusterError,
    calls: AtomicUsize,
}

impl ClusterDirectory for FirstCallFails {
    fn local_node_name(&self) -> &str {
        self.inner.local_node_name()
    }

    fn local_node_status(&self) -> Result<NodeStatus, ClusterError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(self.error.clone());
        }
        self.inner.local_node_status()
    }

    fn database_names(&self) -> Result<Vec<String>, ClusterError> {
        self.inner.database_names()
    }

    fn database_status(
        &self,
        node: &str,
        database: &str,
    ) -> Result<Option<DbStatus>, ClusterError> {
        self.inner.database_status(node, database)
    }

    fn set_database_status(
        &self,
        node: &str,
        database: &str,
        status: DbStatus,
    ) -> Result<(), ClusterError> {
        self.inner.set_database_status(node, database, status)
    }

    fn online_nodes(&self, database: &str) -> Result<Vec<String>, ClusterError> {
        self.inner.online_nodes(database)
    }
}

fn stalled_cluster() -> Arc<InMemoryDirectory> {
    let dir = cluster(&["P1", "P2"]);
    seed(
        &dir,
        "Orders",
        &[
            (LOCAL, DbStatus::Online),
            ("P1", DbStatus::Online),
            ("P2", DbStatus::Online),
        ],
    );
    dir
}

#[tokio::test]
async fn test_recovered_database_is_stall_checked_in_same_cycle() {
    let dir = cluster(&["P1", "P2"]);
    seed(
        &dir,
        "Orders",
        &[
            (LOCAL, DbStatus::Offline),
            ("P1", DbStatus::Online),
            ("P2", DbStatus::Online),
        ],
    );
    let heartbeat = ScriptedHeartbeat::responding(&["P1"]);
    let cycle = HealthCheckCycle::new(
        dir.clone(),
        heartbeat.clone(),
        RecordingInstaller::returning(Ok(true)),
        health_config(true),
    );

    assert_eq!(cycle.run().await, CycleOutcome::Completed);

    assert_eq!(status(&dir, LOCAL, "Orders"), Some(DbStatus::Online));
    assert_eq!(status(&dir, "P1", "Orders"), Some(DbStatus::Online));
    assert_eq!(status(&dir, "P2", "Orders"), Some(DbStatus::Offline));
    assert_eq!(heartbeat.calls().len(), 1);
}

#[tokio::test]
async fn test_missing_status_is_reported_and_left_missing() {
    let dir = cluster(&["P1"]);
    seed(&dir, "Orders", &[("P1", DbStatus::Online)]);
    let heartbeat = ScriptedHeartbeat::responding(&["P1"]);
    let installer = RecordingInstaller::returning(Ok(true));
    let cycle = HealthCheckCycle::new(dir.clone(), heartbeat.clone(), installer.clone(), health_config(true));

    assert_eq!(cycle.run().await, CycleOutcome::Completed);
    assert_eq!(cycle.auditor().check_database_statuses().unwrap(), vec!["Orders"]);

    assert_eq!(status(&dir, LOCAL, "Orders"), None);
    assert!(installer.sources().is_empty());
    assert!(heartbeat.calls().is_empty());
}

#[tokio::test]
async fn test_failing_check_does_not_block_stall_detection() {
    let inner = stalled_cluster();
    let dir = Arc::new(FirstCallFails {
        inner: inner.clone(),
        error: ClusterError::Transport("membership map timeout".to_string()),
        calls: AtomicUsize::new(0),
    });
    let cycle = HealthCheckCycle::new(
        dir,
        ScriptedHeartbeat::responding(&["P1"]),
        RecordingInstaller::returning(Ok(true)),
        health_config(true),
    );

    assert_eq!(cycle.run().await, CycleOutcome::Completed);
    assert_eq!(status(&inner, "P2", "Orders"), Some(DbStatus::Offline));
}

#[tokio::test]
async fn test_transport_closed_ends_cycle_early() {
    let inner = stalled_cluster();
    let dir = Arc::new(FirstCallFails {
        inner: inner.clone(),
        error: ClusterError::TransportClosed,
        calls: AtomicUsize::new(0),
    });
    let heartbeat = ScriptedHeartbeat::responding(&["P1"]);
    let cycle = HealthCheckCycle::new(
        dir,
        heartbeat.clone(),
        RecordingInstaller::returning(Ok(true)),
        health_config(true),
    );

    assert_eq!(cycle.run().await, CycleOutcome::Interrupted);
    assert!(heartbeat.calls().is_empty());
    assert_eq!(status(&inner, "P2", "Orders"), Some(DbStatus::Online));

    // the next cycle runs normally
    assert_eq!(cycle.run().await, CycleOutcome::Completed);
    assert_eq!(status(&inner, "P2", "Orders"), Some(DbStatus::Offline));
}

#[tokio::test]
async fn test_starting_node_changes_nothing() {
    let dir = stalled_cluster();
    dir.set_node_status(LOCAL, NodeStatus::Starting);
    seed(&dir, "Customers", &[(LOCAL, DbStatus::Offline)]);
    let heartbeat = ScriptedHeartbeat::responding(&[]);
    let cycle = HealthCheckCycle::new(
        dir.clone(),
        heartbeat.clone(),
        RecordingInstaller::returning(Ok(true)),
        health_config(true),
    );
    let writes = dir.status_writes();

    assert_eq!(cycle.run().await, CycleOutcome::Completed);
    assert_eq!(dir.status_writes(), writes);
    assert!(heartbeat.calls().is_empty());
}
