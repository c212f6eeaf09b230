//! Configuration types for the watcher
//!
//! Every field has a default, so an empty (or missing) config file yields a
//! usable configuration for the stock router setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::{DesiredSources, DhcpSourceKind};

/// Environment variable consulted for the default router password
pub const PASSWORD_ENV: &str = "ROUTER_PASSWORD";

/// Main watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Verbose logging, including router request/response bodies
    #[serde(default)]
    pub debug: bool,

    /// Router connection settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Executable invoked with the vendor class ID of each corrected source
    #[serde(default)]
    pub notify_script: Option<PathBuf>,

    /// Interval between reconciliation cycles (in seconds)
    #[serde(default = "default_check_period_secs")]
    pub check_period_secs: u64,

    /// Desired flag per vendor class identifier
    #[serde(default = "default_dhcp_sources")]
    pub dhcp_sources: DesiredSources,

    /// Upper bound on graceful shutdown (in seconds)
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Capacity of the watcher event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Runtime tuning
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl WatcherConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            debug: false,
            router: RouterConfig::default(),
            notify_script: None,
            check_period_secs: default_check_period_secs(),
            dhcp_sources: default_dhcp_sources(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }

        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::new());
        };

        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("unable to open config file {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&yaml).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.router.validate()?;

        if self.check_period_secs == 0 {
            return Err(Error::config("check_period_secs must be > 0"));
        }

        if self.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be > 0"));
        }

        if let Some(script) = &self.notify_script
            && script.as_os_str().is_empty()
        {
            return Err(Error::config("notify_script cannot be empty"));
        }

        self.runtime.validate()
    }

    /// Interval between reconciliation cycles
    pub fn check_period(&self) -> Duration {
        Duration::from_secs(self.check_period_secs)
    }

    /// Upper bound on graceful shutdown
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Router connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the web-management UI
    #[serde(default = "default_upstream")]
    pub upstream: String,

    /// Login name
    #[serde(default = "default_username")]
    pub username: String,

    /// Login password
    /// ⚠️ NEVER log this value
    #[serde(default = "default_password")]
    pub password: String,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// PEM file with the firmware's request-signing public key
    ///
    /// A placeholder key the router rejects is used when unset.
    #[serde(default)]
    pub encryption_key: Option<PathBuf>,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("upstream", &self.upstream)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("timeout_secs", &self.timeout_secs)
            .field("encryption_key", &self.encryption_key)
            .finish()
    }
}

impl RouterConfig {
    /// Create a router configuration with the default timeout
    pub fn new(
        upstream: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            upstream: upstream.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs: default_timeout_secs(),
            encryption_key: None,
        }
    }

    /// Validate the router configuration
    pub fn validate(&self) -> Result<()> {
        if self.upstream.is_empty() {
            return Err(Error::config("router upstream cannot be empty"));
        }

        if !self.upstream.starts_with("http://") && !self.upstream.starts_with("https://") {
            return Err(Error::config(format!(
                "router upstream must use HTTP or HTTPS scheme. Got: {}",
                self.upstream
            )));
        }

        if self.username.is_empty() {
            return Err(Error::config("router username cannot be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::config("router timeout_secs must be > 0"));
        }

        Ok(())
    }

    /// Per-request HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(default_upstream(), default_username(), default_password())
    }
}

/// Async runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads; 1 selects a current-thread runtime
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl RuntimeConfig {
    fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::config("runtime worker_threads must be > 0"));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
        }
    }
}

fn default_upstream() -> String {
    "http://192.168.1.1".to_string()
}

fn default_username() -> String {
    "mgts".to_string()
}

fn default_password() -> String {
    std::env::var(PASSWORD_ENV).unwrap_or_default()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_check_period_secs() -> u64 {
    300
}

fn default_dhcp_sources() -> DesiredSources {
    DesiredSources::from([("LAN1".to_string(), DhcpSourceKind::Internet)])
}

fn default_shutdown_timeout_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_worker_threads() -> usize {
    1
}
