//! Cluster health checking
//!
//! This module provides:
//! - Recovery of local database copies marked OFFLINE
//! - Audit of missing local status entries
//! - Heartbeat-based detection and demotion of stalled peers
//! - The periodic cycle driving the three checks

mod auditor;
mod cycle;
mod recovery;
mod stall;

pub use auditor::StatusAuditor;
pub use cycle::{CycleOutcome, HealthCheckCycle};
pub use recovery::{
    DatabaseInstaller, RecoveryAttempt, RecoveryCoordinator, RecoveryOutcome, ReplicationSource,
};
pub use stall::{Demotion, DemotionPolicy, PeerDemotion, StallDetector};
