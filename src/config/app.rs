//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::export::{
    DEFAULT_UPLOAD_TIMEOUT, DailySchedule, DirectoryUploader, ExportError, HttpUploader,
    SnapshotUploader,
};
use crate::storage::DEFAULT_CHANNEL_CAPACITY;

use super::validation::{ConfigError, expand_env_vars, parse_time_of_day};

// =============================================================================
// Constants
// =============================================================================

/// Default webhook port.
pub const DEFAULT_PORT: u16 = 4567;

/// Default store file.
pub const DEFAULT_STORE_PATH: &str = "SBSBS.csv";

/// Default daily export time (UTC).
pub const DEFAULT_EXPORT_TIME: &str = "23:59:00";

/// Default prefix of exported file names.
pub const DEFAULT_FILE_PREFIX: &str = "SBSBS_Report_File";

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_upload_timeout() -> Duration {
    DEFAULT_UPLOAD_TIMEOUT
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 4567).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Store file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store file path.
    pub path: String,

    /// Writer actor command channel capacity (default: 1024).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORE_PATH.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// =============================================================================
// Export Configuration
// =============================================================================

/// Where daily snapshots go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportTargetConfig {
    /// Copy into a local directory.
    Directory { path: String },

    /// `PUT` to `<url>/<name>`.
    Http {
        url: String,
        /// Supports `${VAR}` / `${VAR:-default}` expansion.
        #[serde(default)]
        bearer_token: Option<String>,
        #[serde(default = "default_upload_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
}

impl Default for ExportTargetConfig {
    fn default() -> Self {
        Self::Directory {
            path: "exports".to_string(),
        }
    }
}

/// Daily export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Whether the export job is registered at all.
    pub enabled: bool,

    /// Time of day in UTC, `HH:MM` or `HH:MM:SS` (default: "23:59:00").
    pub time_of_day: String,

    /// Prefix of exported file names (default: "SBSBS_Report_File").
    pub file_prefix: String,

    /// Upload target.
    pub target: ExportTargetConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_of_day: DEFAULT_EXPORT_TIME.to_string(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            target: ExportTargetConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Daily schedule derived from `time_of_day`.
    pub fn schedule(&self) -> Result<DailySchedule, ExportError> {
        let time = parse_time_of_day(&self.time_of_day).map_err(ExportError::Config)?;
        DailySchedule::at(time)
    }

    /// Build the configured uploader.
    pub fn to_uploader(&self) -> Result<Arc<dyn SnapshotUploader>, ExportError> {
        match &self.target {
            ExportTargetConfig::Directory { path } => Ok(Arc::new(DirectoryUploader::new(
                path,
                self.file_prefix.clone(),
            ))),
            ExportTargetConfig::Http {
                url,
                bearer_token,
                timeout,
            } => {
                let token = bearer_token.as_deref().map(expand_env_vars);
                Ok(Arc::new(HttpUploader::new(
                    url.clone(),
                    token,
                    self.file_prefix.clone(),
                    *timeout,
                )?))
            }
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Store configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Daily export configuration.
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage path must not be empty".to_string(),
            ));
        }

        if self.storage.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "storage channel_capacity must be positive".to_string(),
            ));
        }

        self.export.validate()
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        parse_time_of_day(&self.time_of_day)
            .map_err(|e| ConfigError::ValidationError(format!("export time_of_day: {e}")))?;

        if self.file_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "export file_prefix must not be empty".to_string(),
            ));
        }

        match &self.target {
            ExportTargetConfig::Directory { path } if path.trim().is_empty() => Err(
                ConfigError::ValidationError("export directory path must not be empty".to_string()),
            ),
            ExportTargetConfig::Http { url, .. }
                if !url.starts_with("http://") && !url.starts_with("https://") =>
            {
                Err(ConfigError::ValidationError(format!(
                    "export url must start with http:// or https://: '{url}'"
                )))
            }
            ExportTargetConfig::Http { timeout, .. } if timeout.is_zero() => Err(
                ConfigError::ValidationError("export timeout must be non-zero".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 4567);
        assert_eq!(config.storage.path, "SBSBS.csv");
        assert_eq!(config.storage.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.export.enabled);
        assert_eq!(config.export.file_prefix, "SBSBS_Report_File");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
server:
  bind: "127.0.0.1"
  port: 8080
storage:
  path: "/var/lib/basking/SBSBS.csv"
export:
  enabled: true
  time_of_day: "06:30"
  file_prefix: "station_"
  target:
    kind: http
    url: "https://files.example/upload"
    bearer_token: "${NONEXISTENT_BASKING_TOKEN:-abc}"
    timeout: 30s
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.export.schedule().unwrap().cron_expression(), "0 30 6 * * *");

        match &config.export.target {
            ExportTargetConfig::Http { url, timeout, .. } => {
                assert_eq!(url, "https://files.example/upload");
                assert_eq!(*timeout, Duration::from_secs(30));
            }
            other => panic!("unexpected target: {other:?}"),
        }
        assert_eq!(config.export.to_uploader().unwrap().kind(), "http");
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let config: AppConfig = serde_yaml::from_str("storage:\n  path: data.csv\n").unwrap();
        assert_eq!(config.storage.path, "data.csv");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(matches!(
            config.export.target,
            ExportTargetConfig::Directory { .. }
        ));
        assert_eq!(config.export.to_uploader().unwrap().kind(), "directory");
    }

    #[test]
    fn test_config_validation_invalid_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind = "not-an-ip".to_string();

        let result = config.validate();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid server bind address")
        );
    }

    #[test]
    fn test_config_validation_storage() {
        let mut config = AppConfig::default();
        config.storage.path = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_export() {
        let mut config = AppConfig::default();
        config.export.time_of_day = "25:00".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.file_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.target = ExportTargetConfig::Http {
            url: "ftp://files.example".to_string(),
            bearer_token: None,
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        };
        assert!(config.validate().unwrap_err().to_string().contains("export url"));

        let mut config = AppConfig::default();
        config.export.target = ExportTargetConfig::Http {
            url: "https://files.example".to_string(),
            bearer_token: None,
            timeout: Duration::ZERO,
        };
        assert!(config.validate().is_err());
    }
}
