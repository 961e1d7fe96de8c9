/*!
Observability infrastructure for shelf.

- Structured logging and tracing setup
- Prometheus metrics per store operation (`metrics` feature)
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use std::time::Duration;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, StoreError};

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<StoreMetrics> = OnceLock::new();

/// Metrics collection for record store operations
///
/// Every series carries an `operation` label (`persist`, `get`, `get_all`,
/// `filter`, `delete`, `clear`, ...).
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct StoreMetrics {
    pub operations_total: IntCounterVec,
    pub errors_total: IntCounterVec,
    pub latency_seconds: HistogramVec,

    // Prometheus registry for scraping
    registry: Registry,
}

#[cfg(feature = "metrics")]
impl StoreMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new("shelf_operations_total", "Record store operations executed"),
            &["operation"],
        )
        .map_err(|e| metric_error("shelf_operations_total", e))?;

        let errors_total = IntCounterVec::new(
            Opts::new("shelf_errors_total", "Record store operations that failed"),
            &["operation"],
        )
        .map_err(|e| metric_error("shelf_errors_total", e))?;

        let latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "shelf_latency_seconds",
                "Duration of record store operations in seconds",
            ),
            &["operation"],
        )
        .map_err(|e| metric_error("shelf_latency_seconds", e))?;

        registry
            .register(Box::new(operations_total.clone()))
            .map_err(|e| metric_error("shelf_operations_total", e))?;
        registry
            .register(Box::new(errors_total.clone()))
            .map_err(|e| metric_error("shelf_errors_total", e))?;
        registry
            .register(Box::new(latency_seconds.clone()))
            .map_err(|e| metric_error("shelf_latency_seconds", e))?;

        Ok(Self {
            operations_total,
            errors_total,
            latency_seconds,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static StoreMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize shelf metrics"))
    }

    /// Record one finished operation
    pub fn record(&self, operation: &str, succeeded: bool, elapsed: Duration) {
        self.operations_total.with_label_values(&[operation]).inc();
        if !succeeded {
            self.errors_total.with_label_values(&[operation]).inc();
        }
        self.latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    /// Gather metrics in Prometheus format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| StoreError::Observability(format!("Failed to encode metrics: {e}")))?;

        String::from_utf8(buffer).map_err(|e| {
            StoreError::Observability(format!("Failed to convert metrics to string: {e}"))
        })
    }
}

#[cfg(feature = "metrics")]
fn metric_error(name: &str, e: prometheus::Error) -> StoreError {
    StoreError::Observability(format!("Failed to set up metric {name}: {e}"))
}

/// Feed one finished store operation into the metrics, when enabled
pub(crate) fn observe_operation(operation: &'static str, succeeded: bool, elapsed: Duration) {
    #[cfg(feature = "metrics")]
    StoreMetrics::global().record(operation, succeeded, elapsed);

    #[cfg(not(feature = "metrics"))]
    let _ = (operation, succeeded, elapsed);
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise shelf logs at `info`, or `debug` when
/// `verbose` is set. `json` switches the output to one JSON object per line.
pub fn init_observability(verbose: bool, json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    StoreMetrics::global();

    let default_directive = if verbose { "shelf_core=debug,shelf=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    let installed = if json {
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer.json()))
    } else {
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };
    installed.map_err(|e| {
        StoreError::Observability(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("shelf observability initialized");
    Ok(())
}

/// Initialize observability with default settings
pub fn init_default_observability() -> Result<()> {
    init_observability(false, false)
}
