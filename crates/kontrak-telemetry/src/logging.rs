//! Structured logging with JSON output and sensitive data redaction.

use serde_json::Value;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::{TelemetryConfig, TelemetryError};

const REDACTED: &str = "[REDACTED]";

/// Keys masked by default.
#[must_use]
pub fn default_redact_fields() -> Vec<String> {
    ["password", "api_key", "secret", "token", "authorization"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Filter from `RUST_LOG`, falling back to `level`.
pub(crate) fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    parse_level(level)
}

pub(crate) fn parse_level(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level).map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Initialize the logging subsystem. Output goes to stderr.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(&config.log_level)?;
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json_logs {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);

        subscriber
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let pretty_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        subscriber
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Redact sensitive fields from a JSON value.
///
/// A key is redacted when it contains any of `fields`, ignoring case.
#[must_use]
pub fn redact_sensitive(value: &Value, fields: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let key_lower = key.to_lowercase();
                    let redacted = if fields
                        .iter()
                        .any(|f| key_lower.contains(&f.to_lowercase()))
                    {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_sensitive(val, fields)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_sensitive(v, fields)).collect()),
        other => other.clone(),
    }
}

/// [`redact_sensitive`] with the default field list.
#[must_use]
pub fn redact_default(value: &Value) -> Value {
    redact_sensitive(value, &default_redact_fields())
}
