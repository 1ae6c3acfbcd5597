//! Prometheus metrics for pg_status
//!
//! Exposes metrics via HTTP endpoint for Prometheus scraping.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry};
use std::sync::OnceLock;

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// pg_status metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Probe metrics
    /// Probe results (success, failure, timeout)
    pub probes_total: IntCounterVec,
    /// Duration of a full probe cycle (in seconds)
    pub cycle_duration_seconds: Histogram,

    // Host metrics
    /// Current host counts by liveness
    pub hosts: IntGaugeVec,
    /// Replay delay per host, -1 when unknown
    pub replication_delay_ms: IntGaugeVec,
    /// WAL byte lag per host, -1 when unknown
    pub replication_delay_bytes: IntGaugeVec,

    // Selection metrics
    /// Host selections by route and outcome
    pub selections_total: IntCounterVec,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        let probes_total = IntCounterVec::new(
            Opts::new("pg_status_probes_total", "Total number of host probes by result"),
            &["result"], // success, failure, timeout
        )
        .unwrap();

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pg_status_cycle_duration_seconds",
                "Time to probe every host once, in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .unwrap();

        let hosts = IntGaugeVec::new(
            Opts::new("pg_status_hosts", "Current number of hosts by liveness"),
            &["status"], // alive, dead
        )
        .unwrap();

        let replication_delay_ms = IntGaugeVec::new(
            Opts::new(
                "pg_status_replication_delay_ms",
                "Milliseconds since the last replayed transaction",
            ),
            &["host"],
        )
        .unwrap();

        let replication_delay_bytes = IntGaugeVec::new(
            Opts::new(
                "pg_status_replication_delay_bytes",
                "WAL bytes between the primary and the replay position",
            ),
            &["host"],
        )
        .unwrap();

        let selections_total = IntCounterVec::new(
            Opts::new(
                "pg_status_selections_total",
                "Total number of host selections by route and outcome",
            ),
            &["route", "outcome"], // found, fallback, not_found
        )
        .unwrap();

        // Register all metrics
        registry
            .register(Box::new(probes_total.clone()))
            .unwrap();
        registry
            .register(Box::new(cycle_duration_seconds.clone()))
            .unwrap();
        registry.register(Box::new(hosts.clone())).unwrap();
        registry
            .register(Box::new(replication_delay_ms.clone()))
            .unwrap();
        registry
            .register(Box::new(replication_delay_bytes.clone()))
            .unwrap();
        registry
            .register(Box::new(selections_total.clone()))
            .unwrap();

        Self {
            registry,
            probes_total,
            cycle_duration_seconds,
            hosts,
            replication_delay_ms,
            replication_delay_bytes,
            selections_total,
        }
    }

    /// Record a probe result
    pub fn record_probe(&self, result: &str) {
        self.probes_total.with_label_values(&[result]).inc();
    }

    /// Record a completed probe cycle
    pub fn observe_cycle(&self, duration_secs: f64) {
        self.cycle_duration_seconds.observe(duration_secs);
    }

    /// Update host liveness counts
    pub fn set_hosts(&self, alive: i64, dead: i64) {
        self.hosts.with_label_values(&["alive"]).set(alive);
        self.hosts.with_label_values(&["dead"]).set(dead);
    }

    /// Update replication lag gauges for a host
    pub fn set_replication_delay(&self, host: &str, delay_ms: Option<u64>, delay_bytes: Option<u64>) {
        self.replication_delay_ms
            .with_label_values(&[host])
            .set(gauge_value(delay_ms));
        self.replication_delay_bytes
            .with_label_values(&[host])
            .set(gauge_value(delay_bytes));
    }

    /// Record a host selection
    pub fn record_selection(&self, route: &str, outcome: &str) {
        self.selections_total
            .with_label_values(&[route, outcome])
            .inc();
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
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn gauge_value(v: Option<u64>) -> i64 {
    v.map(|v| i64::try_from(v).unwrap_or(i64::MAX)).unwrap_or(-1)
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(addr: &str) -> anyhow::Result<()> {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tracing::{error, info};

    async fn handle_request(
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let (status, content_type, body) = match req.uri().path() {
            "/metrics" => (
                StatusCode::OK,
                "text/plain; version=0.0.4; charset=utf-8",
                metrics().gather(),
            ),
            "/health" => (StatusCode::OK, "text/plain", "OK".to_string()),
            _ => (StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string()),
        };

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static(content_type),
        );
        Ok(response)
    }

    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Metrics server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!(error = %e, "Metrics server connection error");
            }
        });
    }
}
