//! Configuration for the tracking pipeline and scoring service
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `BREAKIN_*` environment variables.
//!
//! # Configuration File Format
//!
//! ```toml
//! api_base_url = "http://127.0.0.1:3000"
//! request_timeout_ms = 10000
//! snapshot_cadence = 10
//! tick_interval_ms = 1000
//! bind_addr = "127.0.0.1:3000"
//! event_capacity = 1000
//! heartbeat_interval_secs = 10
//! session_idle_secs = 3600
//! ```

use crate::error::{BreakinError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix (`BREAKIN_API_BASE_URL`, ...)
const ENV_PREFIX: &str = "BREAKIN";

/// Default config file stem looked up in the working directory
const DEFAULT_CONFIG_NAME: &str = "breakin";

/// Settings shared by the session controller, dispatcher and API server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Base URL of the scoring service
    pub api_base_url: String,
    /// Timeout for one scoring request
    pub request_timeout_ms: u64,
    /// Dispatch a snapshot every N code changes (0 disables)
    pub snapshot_cadence: u64,
    /// Metrics timer period
    pub tick_interval_ms: u64,
    /// Address the API server binds to
    pub bind_addr: String,
    /// Event channel capacity
    pub event_capacity: usize,
    /// Heartbeat period on the event stream
    pub heartbeat_interval_secs: u64,
    /// Server-side sessions without snapshots for this long are evicted (0 keeps them)
    pub session_idle_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_ms: 10_000,
            snapshot_cadence: 10,
            tick_interval_ms: 1_000,
            bind_addr: "127.0.0.1:3000".to_string(),
            event_capacity: 1000,
            heartbeat_interval_secs: 10,
            session_idle_secs: 3600,
        }
    }
}

impl TrackingConfig {
    /// Load from the default file (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(DEFAULT_CONFIG_NAME).required(false))
    }

    /// Load from an explicit file, which must exist, and the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::build(File::from(path).required(true))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!("Loaded tracking config: {:?}", config);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(BreakinError::Config(config::ConfigError::Message(
                "tick_interval_ms must be greater than zero".to_string(),
            )));
        }
        if self.event_capacity == 0 {
            return Err(BreakinError::Config(config::ConfigError::Message(
                "event_capacity must be greater than zero".to_string(),
            )));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn session_idle_timeout(&self) -> Option<Duration> {
        (self.session_idle_secs > 0).then(|| Duration::from_secs(self.session_idle_secs))
    }

    /// Parsed bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            BreakinError::Config(config::ConfigError::Message(format!(
                "Invalid bind address '{}': {}",
                self.bind_addr, e
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    fn clear_env() {
        for key in [
            "BREAKIN_API_BASE_URL",
            "BREAKIN_REQUEST_TIMEOUT_MS",
            "BREAKIN_SNAPSHOT_CADENCE",
            "BREAKIN_BIND_ADDR",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = TrackingConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.snapshot_cadence, 10);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.session_idle_timeout(), Some(Duration::from_secs(3600)));
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn test_zero_idle_timeout_keeps_sessions() {
        let config = TrackingConfig {
            session_idle_secs: 0,
            ..TrackingConfig::default()
        };
        assert_eq!(config.session_idle_timeout(), None);
    }

    #[test]
    #[serial]
    fn test_file_values_fill_over_defaults() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "snapshot_cadence = 5").unwrap();
        writeln!(file, "api_base_url = \"http://scoring.internal:8080\"").unwrap();

        let config = TrackingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.snapshot_cadence, 5);
        assert_eq!(config.api_base_url, "http://scoring.internal:8080");
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    #[serial]
    fn test_env_var_takes_precedence() {
        clear_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "snapshot_cadence = 5").unwrap();

        env::set_var("BREAKIN_SNAPSHOT_CADENCE", "25");
        let config = TrackingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.snapshot_cadence, 25);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_bind_addr_rejected() {
        clear_env();
        env::set_var("BREAKIN_BIND_ADDR", "not-an-address");
        let result = TrackingConfig::load();
        assert!(matches!(result, Err(BreakinError::Config(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        clear_env();
        let result = TrackingConfig::from_file(Path::new("/nonexistent/breakin.toml"));
        assert!(result.is_err());
    }
}
