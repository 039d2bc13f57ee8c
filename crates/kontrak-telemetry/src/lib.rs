//! Kontrak Telemetry - logging setup for the kontrak client and CLI.
//!
//! - **Structured Logging**: JSON or human-readable output through `tracing-subscriber`
//! - **Redaction**: sensitive keys are masked before payloads reach the log
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kontrak_telemetry::{TelemetryConfig, init_telemetry};
//!
//! init_telemetry(&TelemetryConfig::new("kontrak").with_json_logs(false))?;
//! tracing::info!(entity = "termin", "loading");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod logging;

pub use logging::*;

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name recorded on startup.
    pub service_name: String,

    /// Log level filter (e.g., "info", "debug", "trace"). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable JSON log output.
    pub json_logs: bool,

    /// Fields to redact from logs (sensitive data).
    pub redact_fields: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "kontrak".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            redact_fields: default_redact_fields(),
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable JSON logs.
    #[must_use]
    pub const fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Add fields to redact from logs.
    #[must_use]
    pub fn with_redact_fields(mut self, fields: Vec<String>) -> Self {
        self.redact_fields.extend(fields);
        self
    }
}

/// Initialize logging.
///
/// Call once at startup; a second call fails because the global subscriber is
/// already installed.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber already exists.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)?;
    tracing::debug!(service = %config.service_name, "telemetry initialized");
    Ok(())
}

/// Telemetry error type.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
