//! Telemetry infrastructure
//!
//! TigerStyle: Explicit telemetry configuration.
//!
//! Sets up the tracing subscriber used across the runtime. The runtime itself
//! only emits `tracing` events; how they are rendered is decided here, once,
//! by the embedding application.

use crate::error::{Error, Result};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log output
    pub service_name: String,
    /// Log level filter
    pub log_level: String,
    /// Whether to include span targets in output
    pub targets_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "selkie".to_string(),
            log_level: "info".to_string(),
            targets_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Hide span targets in output
    pub fn without_targets(mut self) -> Self {
        self.targets_enabled = false;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - `SELKIE_SERVICE_NAME`: Service name (default: "selkie")
    /// - `RUST_LOG`: Log level filter (default: "info")
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("SELKIE_SERVICE_NAME").unwrap_or_else(|_| "selkie".to_string());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            service_name,
            log_level,
            targets_enabled: true,
        }
    }
}

/// Initialize the tracing subscriber
///
/// Respects `RUST_LOG` when set; falls back to the configured log level.
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,ignore
/// use selkie_core::telemetry::{init_telemetry, TelemetryConfig};
///
/// init_telemetry(&TelemetryConfig::new("my-service"))?;
/// ```
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.targets_enabled)
        .try_init()
        .map_err(|e| Error::Internal {
            reason: format!("failed to initialize tracing subscriber: {}", e),
        })?;

    tracing::info!(service = %config.service_name, "telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "selkie");
        assert_eq!(config.log_level, "info");
        assert!(config.targets_enabled);
    }

    #[test]
    fn test_telemetry_config_builder() {
        let config = TelemetryConfig::new("test-service")
            .with_log_level("debug")
            .without_targets();

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.log_level, "debug");
        assert!(!config.targets_enabled);
    }
}
