//! Application configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use portalbox_controller::ControllerConfig;
use portalbox_storage::{DatabaseConfig, PolicyDefaults, normalize_mac};
use serde::{Deserialize, Serialize};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/portalbox/config.toml";

/// Network interfaces tried, in order, when no MAC address is configured.
const MAC_INTERFACES: [&str; 3] = ["eth0", "wlan0", "end0"];

/// Complete configuration of one box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(rename = "box")]
    pub portal_box: BoxConfig,

    pub controller: ControllerConfig,

    pub database: DatabaseConfig,

    /// Session limits for equipment records that leave them unset.
    pub policy: PolicyDefaults,

    pub logging: LoggingConfig,

    pub watchdog: WatchdogConfig,
}

/// Identity of this box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxConfig {
    /// MAC address the box registers under; read from the network
    /// interface when unset.
    pub mac: Option<String>,

    /// Delay between equipment profile lookups while waiting for an
    /// operator to set the box up.
    pub discovery_retry_secs: u64,
}

impl Default for BoxConfig {
    fn default() -> Self {
        Self {
            mac: None,
            discovery_retry_secs: 5,
        }
    }
}

impl BoxConfig {
    pub fn discovery_retry(&self) -> Duration {
        Duration::from_secs(self.discovery_retry_secs)
    }

    /// Normalized MAC address: the configured one, else the first network
    /// interface found under `/sys/class/net`.
    pub fn resolve_mac(&self) -> Result<String> {
        if let Some(mac) = &self.mac {
            return Ok(normalize_mac(mac)?);
        }
        detect_mac(Path::new("/sys/class/net"))
    }
}

fn detect_mac(sys_class_net: &Path) -> Result<String> {
    for interface in MAC_INTERFACES {
        let path = sys_class_net.join(interface).join("address");
        if let Ok(address) = std::fs::read_to_string(&path) {
            return normalize_mac(&address)
                .with_context(|| format!("Unexpected address in {}", path.display()));
        }
    }
    bail!("No MAC address configured and none of {MAC_INTERFACES:?} found; set box.mac")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `portalbox=debug,sqlx=warn`.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Write audit events to the database `log` table as well as to the
    /// diagnostic log.
    pub audit_to_database: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            audit_to_database: true,
        }
    }
}

/// File that an external watchdog checks for freshness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    pub path: PathBuf,

    /// Minimum delay between rewrites while the state is unchanged.
    pub interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("/run/portalbox/state"),
            interval_ms: 1_000,
        }
    }
}

impl AppConfig {
    /// Read and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.controller
            .validate()
            .context("Invalid [controller] section")?;
        self.database
            .validate()
            .context("Invalid [database] section")?;
        if let Some(mac) = &self.portal_box.mac {
            normalize_mac(mac).context("Invalid box.mac")?;
        }
        if self.portal_box.discovery_retry_secs == 0 {
            bail!("box.discovery_retry_secs must be positive");
        }
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        if self.watchdog.enabled && self.watchdog.path.as_os_str().is_empty() {
            bail!("watchdog.path must be set when the watchdog is enabled");
        }
        Ok(())
    }
}
