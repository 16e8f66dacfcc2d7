//! Prometheus metrics for the cluster health loop
//!
//! Exposes metrics via HTTP endpoint for Prometheus scraping.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Health loop metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Cycle metrics
    /// Health check cycles run
    pub cycles_total: IntCounter,
    /// Ticks skipped because the previous cycle was still running
    pub cycles_skipped_total: IntCounter,
    /// Errors escaping a check, by check name
    pub check_errors_total: IntCounterVec,

    // Repair metrics
    /// Recovery attempts by result
    pub recovery_total: IntCounterVec,
    /// Heartbeat rounds by result
    pub heartbeat_total: IntCounterVec,
    /// Demotion decisions by outcome
    pub demotions_total: IntCounterVec,
    /// Missing local status entries observed
    pub missing_status_total: IntCounter,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        let cycles_total = IntCounter::new(
            "replica_health_cycles_total",
            "Total number of health check cycles run",
        )
        .unwrap();

        let cycles_skipped_total = IntCounter::new(
            "replica_health_cycles_skipped_total",
            "Total number of ticks skipped while a cycle was still running",
        )
        .unwrap();

        let check_errors_total = IntCounterVec::new(
            Opts::new(
                "replica_health_check_errors_total",
                "Total number of errors escaping a health check",
            ),
            &["check"], // server_status, database_statuses, server_in_stall
        )
        .unwrap();

        let recovery_total = IntCounterVec::new(
            Opts::new(
                "replica_health_recovery_total",
                "Total number of database recovery attempts by result",
            ),
            &["result"], // promoted, recovered, failed
        )
        .unwrap();

        let heartbeat_total = IntCounterVec::new(
            Opts::new(
                "replica_health_heartbeat_total",
                "Total number of heartbeat rounds by result",
            ),
            &["result"], // complete, partial, unreachable
        )
        .unwrap();

        let demotions_total = IntCounterVec::new(
            Opts::new(
                "replica_health_demotions_total",
                "Total number of peer demotion decisions by outcome",
            ),
            &["outcome"], // demoted, suppressed
        )
        .unwrap();

        let missing_status_total = IntCounter::new(
            "replica_health_missing_status_total",
            "Total number of missing local database status entries observed",
        )
        .unwrap();

        // Register all metrics
        registry.register(Box::new(cycles_total.clone())).unwrap();
        registry
            .register(Box::new(cycles_skipped_total.clone()))
            .unwrap();
        registry
            .register(Box::new(check_errors_total.clone()))
            .unwrap();
        registry.register(Box::new(recovery_total.clone())).unwrap();
        registry.register(Box::new(heartbeat_total.clone())).unwrap();
        registry.register(Box::new(demotions_total.clone())).unwrap();
        registry
            .register(Box::new(missing_status_total.clone()))
            .unwrap();

        Self {
            registry,
            cycles_total,
            cycles_skipped_total,
            check_errors_total,
            recovery_total,
            heartbeat_total,
            demotions_total,
            missing_status_total,
        }
    }

    pub fn record_cycle(&self) {
        self.cycles_total.inc();
    }

    pub fn record_cycle_skipped(&self) {
        self.cycles_skipped_total.inc();
    }

    pub fn record_check_error(&self, check: &str) {
        self.check_errors_total.with_label_values(&[check]).inc();
    }

    pub fn record_recovery(&self, result: &str) {
        self.recovery_total.with_label_values(&[result]).inc();
    }

    pub fn record_heartbeat(&self, result: &str) {
        self.heartbeat_total.with_label_values(&[result]).inc();
    }

    pub fn record_demotion(&self, outcome: &str) {
        self.demotions_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_missing_status(&self) {
        self.missing_status_total.inc();
    }

    /// Get metrics as Prometheus text format
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Answer a scrape request by path
///
/// `/metrics` serves the exposition text, `/health` reports liveness of the
/// health loop process.
pub fn route(path: &str) -> hyper::Response<http_body_util::Full<hyper::body::Bytes>> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::{Response, StatusCode};

    let (status, body, content_type) = match path {
        "/metrics" => (StatusCode::OK, metrics().gather(), METRICS_CONTENT_TYPE),
        "/health" => (StatusCode::OK, "OK".to_string(), "text/plain"),
        _ => (StatusCode::NOT_FOUND, "Not Found".to_string(), "text/plain"),
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Serve `route` over HTTP/1 until `shutdown` fires
pub async fn start_metrics_server(addr: &str, shutdown: CancellationToken) -> anyhow::Result<()> {
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tracing::{debug, error, info};

    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Metrics server listening");

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(addr = %addr, "Metrics server stopped");
                return Ok(());
            }
            accepted = listener.accept() => accepted?,
        };
        debug!(peer = %peer, "Metrics scrape connection");
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let service = service_fn(|req: hyper::Request<hyper::body::Incoming>| async move {
                Ok::<_, Infallible>(route(req.uri().path()))
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %e, "Metrics server connection error");
            }
        });
    }
}
