//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default token refresh threshold (5 minutes).
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(300);

/// Smallest accepted refresh threshold (1 minute). Anything lower would
/// refresh on nearly every call.
pub const MIN_REFRESH_THRESHOLD: Duration = Duration::from_secs(60);

/// Largest accepted refresh threshold (1 hour). Matching the token lifetime
/// would refresh immediately and forever.
pub const MAX_REFRESH_THRESHOLD: Duration = Duration::from_secs(3600);

/// Default collection interval (30 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_refresh_threshold() -> Duration {
    DEFAULT_REFRESH_THRESHOLD
}

fn default_verify_tls() -> bool {
    true
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Status API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Appliance Configuration
// =============================================================================

/// Connection settings for the remote power-monitoring appliance.
///
/// `username` and `password` accept `${VAR}` environment references so the
/// YAML file never has to carry the secret itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceConfig {
    /// Base URL of the appliance API (http or https).
    pub base_url: String,

    /// Login user.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Per-request timeout (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Verify the appliance TLS certificate (default: true). Field units
    /// ship with self-signed certificates, hence the escape hatch.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// How long before token expiry a refresh is triggered (default: 5m,
    /// accepted band 1m-1h).
    #[serde(default = "default_refresh_threshold", with = "humantime_serde")]
    pub refresh_threshold: Duration,
}

impl ApplianceConfig {
    /// Create a configuration with defaults for everything but the target.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set TLS verification.
    #[must_use]
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Set the refresh threshold.
    #[must_use]
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Resolve `${VAR}` references in the credential fields.
    pub fn expand_credentials(&mut self) {
        self.base_url = expand_env_vars(&self.base_url);
        self.username = expand_env_vars(&self.username);
        self.password = expand_env_vars(&self.password);
    }

    /// Validate connection settings.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` on a malformed URL, empty
    /// credentials, a zero timeout, or a refresh threshold outside the
    /// accepted band.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!("invalid appliance base_url '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "appliance base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.username.is_empty() {
            return Err(ConfigError::Validation(
                "appliance username must not be empty".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Validation(
                "appliance password must not be empty".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "appliance timeout must be positive".to_string(),
            ));
        }

        if self.refresh_threshold < MIN_REFRESH_THRESHOLD
            || self.refresh_threshold > MAX_REFRESH_THRESHOLD
        {
            return Err(ConfigError::Validation(format!(
                "appliance refresh_threshold must be between {:?} and {:?}, got {:?}",
                MIN_REFRESH_THRESHOLD, MAX_REFRESH_THRESHOLD, self.refresh_threshold
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Poll Configuration
// =============================================================================

/// Collection schedule: fixed interval or cron expression, not both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollConfig {
    /// Collection interval (mutually exclusive with cron).
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    /// Cron schedule expression (mutually exclusive with interval).
    #[serde(default)]
    pub cron: Option<String>,
}

impl PollConfig {
    /// Effective interval when no cron expression is set.
    pub fn interval_or_default(&self) -> Duration {
        self.interval.unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_some() && self.cron.is_some() {
            return Err(ConfigError::Validation(
                "poll: cannot specify both interval and cron".to_string(),
            ));
        }
        if let Some(interval) = self.interval {
            if interval < Duration::from_secs(1) {
                return Err(ConfigError::Validation(
                    "poll interval must be at least 1 second".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Status API server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Appliance connection settings.
    pub appliance: ApplianceConfig,

    /// Collection schedule.
    #[serde(default)]
    pub poll: PollConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Credential fields have their `${VAR}` references expanded before
    /// validation.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.appliance.expand_credentials();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::Validation(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server port must be non-zero".to_string(),
            ));
        }

        self.appliance.validate()?;
        self.poll.validate()?;
        Ok(())
    }
}
