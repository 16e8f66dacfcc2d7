//! Periodic cluster health check driver

use std::any::Any;
use std::future::Future;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rand::Rng as _;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterDirectory, ClusterError};
use crate::config::HealthCheckConfig;
use crate::heartbeat::HeartbeatTransport;
use crate::metrics::metrics;

use super::auditor::StatusAuditor;
use super::recovery::{DatabaseInstaller, RecoveryCoordinator};
use super::stall::{DemotionPolicy, StallDetector};

/// How a single invocation of the cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// All three checks ran (some may have failed and been logged)
    Completed,
    /// The cluster transport is shutting down, remaining checks were skipped
    Interrupted,
    /// A previous cycle was still running
    Skipped,
}

/// Clears the busy flag when the cycle finishes, even on panic
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs server-status, database-statuses and server-in-stall checks in order
pub struct HealthCheckCycle {
    directory: Arc<dyn ClusterDirectory>,
    recovery: RecoveryCoordinator,
    auditor: StatusAuditor,
    stall: StallDetector,
    config: HealthCheckConfig,
    running: AtomicBool,
}

impl HealthCheckCycle {
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        transport: Arc<dyn HeartbeatTransport>,
        installer: Arc<dyn DatabaseInstaller>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            recovery: RecoveryCoordinator::new(directory.clone(), installer),
            auditor: StatusAuditor::new(directory.clone()),
            stall: StallDetector::new(
                directory.clone(),
                transport,
                DemotionPolicy::from(&config),
            ),
            directory,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn auditor(&self) -> &StatusAuditor {
        &self.auditor
    }

    /// Whether a cycle is currently executing
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one cycle
    ///
    /// Never fails: every error is logged and reduced to the outcome.
    pub async fn run(&self) -> CycleOutcome {
        let Some(_busy) = BusyGuard::try_acquire(&self.running) else {
            warn!(
                local = %self.directory.local_node_name(),
                "Previous cluster health check still running, skipping"
            );
            metrics().record_cycle_skipped();
            return CycleOutcome::Skipped;
        };

        debug!(local = %self.directory.local_node_name(), "Checking cluster health");
        metrics().record_cycle();

        let outcome = self.run_checks().await;

        debug!(
            local = %self.directory.local_node_name(),
            outcome = ?outcome,
            "Cluster health checking completed"
        );
        outcome
    }

    async fn run_checks(&self) -> CycleOutcome {
        if self
            .guarded("server_status", self.recovery.check_server_status())
            .await
            .is_break()
        {
            return CycleOutcome::Interrupted;
        }

        if self
            .guarded("database_statuses", async {
                self.auditor.check_database_statuses()
            })
            .await
            .is_break()
        {
            return CycleOutcome::Interrupted;
        }

        if self
            .guarded("server_in_stall", self.stall.check_server_in_stall())
            .await
            .is_break()
        {
            return CycleOutcome::Interrupted;
        }

        CycleOutcome::Completed
    }

    /// Run one check, absorbing its errors and panics
    ///
    /// Breaks only when the cluster transport is closed.
    async fn guarded<F, T>(&self, check: &'static str, fut: F) -> ControlFlow<()>
    where
        F: Future<Output = Result<T, ClusterError>>,
    {
        let result = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ClusterError::Panicked(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(_) => ControlFlow::Continue(()),
            Err(e) if e.is_transport_closed() => ControlFlow::Break(()),
            Err(e) => {
                error!(
                    local = %self.directory.local_node_name(),
                    check,
                    error = %e,
                    "Error on checking cluster health"
                );
                metrics().record_check_error(check);
                ControlFlow::Continue(())
            }
        }
    }

    /// Spawn the periodic task
    ///
    /// Each tick runs the cycle on its own task so a slow cycle does not
    /// delay the schedule; overlapping ticks are skipped by the busy flag.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        if !self.config.enabled {
            info!("Cluster health checks are disabled");
            return tokio::spawn(async move {
                shutdown.cancelled().await;
            });
        }

        let check_interval = self.config.check_interval();
        info!(
            local = %self.directory.local_node_name(),
            interval_ms = self.config.check_interval_ms,
            heartbeat_timeout_ms = self.config.heartbeat_timeout_ms,
            can_offline_server = self.config.can_offline_server,
            "Cluster health checker started"
        );

        tokio::spawn(async move {
            // Random initial delay to stagger nodes (0-100% of interval)
            let initial_delay = rand::thread_rng().gen_range(0..check_interval.as_millis().max(1) as u64);
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_millis(initial_delay)) => {}
            }

            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Cluster health checker shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let cycle = self.clone();
                        tokio::spawn(async move {
                            cycle.run().await;
                        });
                    }
                }
            }
        })
    }
}

pub(super) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
