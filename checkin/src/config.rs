//! Configuration for the scanner.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No operator id was configured
    #[error("VYBEME_OPERATOR_ID must be set to the operator's user id")]
    MissingOperator,
}

/// Scanner configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ticketing API configuration
    pub api: ApiConfig,
    /// Operator identity
    pub operator: OperatorConfig,
    /// Scanner behaviour
    pub scanner: ScannerConfig,
    /// Process-level settings
    pub server: ServerConfig,
}

/// Ticketing API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.vybeme.app/api`
    pub base_url: String,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
}

/// Operator identity
#[derive(Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Operator user id
    pub operator_id: String,
    /// Bearer token
    pub access_token: Option<String>,
}

impl std::fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("operator_id", &self.operator_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Scanner behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Verification timeout in seconds (unset: wait indefinitely)
    pub scan_timeout: Option<u64>,
    /// Event to open directly, skipping selection
    pub plan_id: Option<String>,
}

/// Process-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Prometheus exporter port (unset: metrics disabled)
    pub metrics_port: Option<u16>,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig {
                base_url: env::var("VYBEME_API_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
                connect_timeout: env::var("VYBEME_HTTP_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            operator: OperatorConfig {
                operator_id: env::var("VYBEME_OPERATOR_ID").unwrap_or_default(),
                access_token: env::var("VYBEME_ACCESS_TOKEN")
                    .ok()
                    .filter(|token| !token.trim().is_empty()),
            },
            scanner: ScannerConfig {
                scan_timeout: env::var("VYBEME_SCAN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0),
                plan_id: env::var("VYBEME_PLAN_ID")
                    .ok()
                    .filter(|id| !id.trim().is_empty()),
            },
            server: ServerConfig {
                metrics_port: env::var("METRICS_PORT").ok().and_then(|s| s.parse().ok()),
                shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
        }
    }

    /// Check that the configuration can drive a session.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingOperator`] when no operator id is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator.operator_id.trim().is_empty() {
            return Err(ConfigError::MissingOperator);
        }
        Ok(())
    }

    /// HTTP connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout)
    }

    /// Verification timeout, if configured
    #[must_use]
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scanner.scan_timeout.map(Duration::from_secs)
    }

    /// Graceful shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }
}
