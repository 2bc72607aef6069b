//! Configuration module for the Wattline application.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Status server settings (port, bind address)
//! - Appliance connection settings (URL, credentials, timeouts)
//! - Collection schedule (interval or cron)

mod app;
mod validation;

pub use app::{AppConfig, ApplianceConfig, PollConfig, ServerConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};

// Re-export constants
pub use app::{
    DEFAULT_POLL_INTERVAL, DEFAULT_REFRESH_THRESHOLD, DEFAULT_TIMEOUT, MAX_REFRESH_THRESHOLD,
    MIN_REFRESH_THRESHOLD,
};
