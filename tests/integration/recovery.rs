//! Server-status check scenarios

use replica_health::cluster::{ClusterError, DbStatus};
use replica_health::health::{RecoveryCoordinator, RecoveryOutcome};

use crate::{cluster, seed, status, RecordingInstaller, LOCAL};

#[tokio::test]
async fn test_orders_recovered_from_online_peer() {
    let dir = cluster(&["P1", "P2"]);
    seed(
        &dir,
        "Orders",
        &[
            (LOCAL, DbStatus::Offline),
            ("P1", DbStatus::Online),
            ("P2", DbStatus::Offline),
        ],
    );
    let installer = RecordingInstaller::returning(Ok(true));
    let coordinator = RecoveryCoordinator::new(dir.clone(), installer.clone());

    let attempts = coordinator.check_server_status().await.unwrap();

    let sources = installer.sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].source_node, "P1");
    assert_eq!(sources[0].servers, vec!["P1"]);
    assert_eq!(
        attempts[0].outcome,
        RecoveryOutcome::Recovered {
            source: "P1".to_string()
        }
    );
    assert_eq!(status(&dir, LOCAL, "Orders"), Some(DbStatus::Online));
    assert_eq!(status(&dir, "P1", "Orders"), Some(DbStatus::Online));
    assert_eq!(status(&dir, "P2", "Orders"), Some(DbStatus::Offline));
}

#[tokio::test]
async fn test_every_offline_database_without_peers_is_promoted() {
    let dir = cluster(&["P1"]);
    seed(&dir, "Orders", &[(LOCAL, DbStatus::Offline), ("P1", DbStatus::Offline)]);
    seed(&dir, "Customers", &[(LOCAL, DbStatus::Offline)]);
    let installer = RecordingInstaller::returning(Ok(false));
    let coordinator = RecoveryCoordinator::new(dir.clone(), installer.clone());

    let attempts = coordinator.check_server_status().await.unwrap();

    assert_eq!(attempts.len(), 2);
    assert!(attempts
        .iter()
        .all(|a| a.outcome == RecoveryOutcome::PromotedLastCopy));
    assert_eq!(status(&dir, LOCAL, "Orders"), Some(DbStatus::Online));
    assert_eq!(status(&dir, LOCAL, "Customers"), Some(DbStatus::Online));
    assert!(installer.sources().is_empty());
}

#[tokio::test]
async fn test_failed_install_is_retried_next_cycle_only() {
    let dir = cluster(&["P1"]);
    seed(&dir, "Orders", &[(LOCAL, DbStatus::Offline), ("P1", DbStatus::Online)]);
    let installer = RecordingInstaller::returning(Err(ClusterError::Install {
        database: "Orders".to_string(),
        reason: "checksum mismatch".to_string(),
    }));
    let coordinator = RecoveryCoordinator::new(dir.clone(), installer.clone());

    coordinator.check_server_status().await.unwrap();
    assert_eq!(installer.sources().len(), 1);
    assert_eq!(status(&dir, LOCAL, "Orders"), Some(DbStatus::Offline));

    coordinator.check_server_status().await.unwrap();
    assert_eq!(installer.sources().len(), 2);
    assert_eq!(status(&dir, LOCAL, "Orders"), Some(DbStatus::Offline));
}

#[tokio::test]
async fn test_second_run_makes_no_transitions() {
    let dir = cluster(&["P1"]);
    seed(&dir, "Orders", &[(LOCAL, DbStatus::Offline), ("P1", DbStatus::Online)]);
    seed(&dir, "Customers", &[(LOCAL, DbStatus::Offline)]);
    seed(&dir, "Invoices", &[(LOCAL, DbStatus::Online)]);
    let installer = RecordingInstaller::returning(Ok(true));
    let coordinator = RecoveryCoordinator::new(dir.clone(), installer.clone());

    assert_eq!(coordinator.check_server_status().await.unwrap().len(), 2);
    let writes = dir.status_writes();

    assert!(coordinator.check_server_status().await.unwrap().is_empty());
    assert_eq!(dir.status_writes(), writes);
    assert_eq!(installer.sources().len(), 1);
    for db in ["Orders", "Customers", "Invoices"] {
        assert_eq!(status(&dir, LOCAL, db), Some(DbStatus::Online));
    }
}
