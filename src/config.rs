//! Configuration module for the basking relay.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Storage settings (store path, writer channel capacity)
//! - Daily export (time of day, file prefix, upload target)

mod app;
mod validation;

pub use app::{AppConfig, ExportConfig, ExportTargetConfig, ServerConfig, StorageConfig};
pub use validation::{ConfigError, expand_env_vars, parse_time_of_day};

// Re-export constants
pub use app::{DEFAULT_EXPORT_TIME, DEFAULT_FILE_PREFIX, DEFAULT_PORT, DEFAULT_STORE_PATH};
