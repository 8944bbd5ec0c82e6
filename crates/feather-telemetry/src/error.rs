//! Telemetry setup errors.

use std::net::AddrParseError;
use thiserror::Error;

/// Failure to install logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive does not parse.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// The directive as configured.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("cannot install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    /// The metrics listen address does not parse.
    #[error("invalid metrics address {addr:?}")]
    InvalidAddress {
        /// The address as configured.
        addr: String,
        /// Parser error.
        #[source]
        source: AddrParseError,
    },

    /// The Prometheus recorder could not be installed.
    #[error("cannot install metrics recorder")]
    Recorder(#[from] metrics_exporter_prometheus::BuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_keeps_source() {
        let source = "nowhere".parse::<std::net::SocketAddr>().unwrap_err();
        let err = TelemetryError::InvalidAddress {
            addr: "nowhere".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "invalid metrics address \"nowhere\"");
        assert!(std::error::Error::source(&err).is_some());
    }
}
