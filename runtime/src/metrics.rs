//! Prometheus metrics for observability and monitoring.
//!
//! The Store records counters and histograms through the `metrics` facade.
//! They are no-ops until a recorder is installed; [`MetricsServer`]
//! installs a Prometheus recorder and serves `/metrics` over HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! use vybeme_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
#[derive(Debug, Clone, Copy)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Address the exporter listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Install the Prometheus recorder and start the HTTP listener.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or a recorder is
    /// already installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }
}

/// Register descriptions for the Store's metrics.
fn register_metrics() {
    describe_counter!("store.commands.total", "Total number of actions sent to the store");
    describe_counter!(
        "store.effects.executed",
        "Total number of effects executed, labelled by effect type"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn server_keeps_configured_address() {
        let addr: SocketAddr = "127.0.0.1:9464".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert_eq!(server.addr(), addr);
    }

    #[test]
    fn install_error_names_the_cause() {
        let err = MetricsError::Install("recorder already set".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to install metrics exporter: recorder already set"
        );
    }
}
