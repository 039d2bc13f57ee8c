//! Client configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kontrak_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Default GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4000/graphql";

/// Upload size limit (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted for upload.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "application/pdf"];

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Service name used in logs.
    pub service_name: String,
    /// HTTP transport settings.
    pub transport: TransportConfig,
    /// Global loading indicator settings.
    pub loading: LoadingConfig,
    /// Notification durations.
    pub notification: NotificationConfig,
    /// Upload limits.
    pub upload: UploadConfig,
    /// Session persistence.
    pub session: SessionConfig,
    /// Operation registry source.
    pub registry: RegistryConfig,
    /// Logging.
    pub telemetry: TelemetrySection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            service_name: "kontrak".to_string(),
            transport: TransportConfig::default(),
            loading: LoadingConfig::default(),
            notification: NotificationConfig::default(),
            upload: UploadConfig::default(),
            session: SessionConfig::default(),
            registry: RegistryConfig::default(),
            telemetry: TelemetrySection::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadingConfig {
    /// Grace period before the indicator hides once idle.
    pub hide_delay_ms: u64,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self { hide_delay_ms: 300 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    pub default_duration_ms: u64,
    pub error_duration_ms: u64,
    pub session_expired_duration_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 3_000,
            error_duration_ms: 5_000,
            session_expired_duration_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted file in bytes.
    pub max_bytes: u64,
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// JSON file holding the persisted session. In-memory when absent.
    pub storage_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registry TOML file. The built-in catalog is used when absent.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".to_string()));
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "upload.max_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.transport.timeout_ms)
    }

    #[must_use]
    pub const fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.loading.hide_delay_ms)
    }

    #[must_use]
    pub const fn default_notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification.default_duration_ms)
    }

    #[must_use]
    pub const fn error_notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification.error_duration_ms)
    }

    #[must_use]
    pub const fn session_expired_duration(&self) -> Duration {
        Duration::from_millis(self.notification.session_expired_duration_ms)
    }

    /// Logging configuration derived from the `[telemetry]` section.
    #[must_use]
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::new(self.service_name.clone())
            .with_log_level(self.telemetry.log_level.clone())
            .with_json_logs(self.telemetry.json_logs)
    }
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
