//! Observability for the Feather request pipeline.
//!
//! - **Logging**: `tracing-subscriber` initialisation (JSON or pretty) and a
//!   [`TracingLogger`] that implements the pipeline's category-aware
//!   [`Logger`](feather_core::Logger) contract on top of `tracing` events.
//! - **Metrics**: Prometheus-format counters and histograms via the `metrics`
//!   crate.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `feather_requests_total` | Counter | `method`, `status` | Completed requests |
//! | `feather_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `feather_not_found_total` | Counter | - | Requests for missing resources |
//! | `feather_uncaught_errors_total` | Counter | - | Uncaught stage failures |
//! | `feather_body_parser_skipped_total` | Counter | - | Body parsing bypassed by an ignore rule |

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat, TracingLogger};
pub use metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
