//! Prometheus metrics for Feather.
//!
//! Recording functions are always safe to call: without an installed
//! recorder the `metrics` macros are no-ops.
//!
//! # Example
//!
//! ```rust,ignore
//! use feather_telemetry::metrics::{init_metrics, record_request, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_request("GET", 200, Duration::from_millis(12));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Completed requests.
pub const REQUESTS_TOTAL: &str = "feather_requests_total";
/// Request latency histogram.
pub const REQUEST_DURATION: &str = "feather_request_duration_seconds";
/// Requests that ended without any resource.
pub const NOT_FOUND_TOTAL: &str = "feather_not_found_total";
/// Uncaught stage failures.
pub const UNCAUGHT_TOTAL: &str = "feather_uncaught_errors_total";
/// Requests whose body parsing was bypassed.
pub const BODY_PARSER_SKIPPED_TOTAL: &str = "feather_body_parser_skipped_total";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::Recorder` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|source| TelemetryError::InvalidAddress {
            addr: config.addr.clone(),
            source,
        })?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests completed");
    describe_histogram!(REQUEST_DURATION, "HTTP request duration in seconds");
    describe_counter!(NOT_FOUND_TOTAL, "Requests for resources that do not exist");
    describe_counter!(UNCAUGHT_TOTAL, "Uncaught failures in the request pipeline");
    describe_counter!(
        BODY_PARSER_SKIPPED_TOTAL,
        "Requests whose body parsing was bypassed by an ignore rule"
    );
}

/// Records a completed request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION, "method" => method.to_string()).record(duration.as_secs_f64());
}

/// Records a request for a missing resource.
pub fn record_not_found() {
    counter!(NOT_FOUND_TOTAL).increment(1);
}

/// Records an uncaught stage failure.
pub fn record_uncaught() {
    counter!(UNCAUGHT_TOTAL).increment(1);
}

/// Records a bypassed body parse.
pub fn record_body_parser_skipped() {
    counter!(BODY_PARSER_SKIPPED_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert!(init_metrics(&config).is_ok());
        assert!(render_metrics().is_none());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        let err = init_metrics(&config).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidAddress { .. }));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, Duration::from_millis(5));
        record_not_found();
        record_uncaught();
        record_body_parser_skipped();
    }
}
