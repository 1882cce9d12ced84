//! Watchdog Configuration - every path, interval and endpoint as TOML values
//!
//! Each struct implements `Default` with the reference deployment's values,
//! so a missing `storewatch.toml` yields a working daemon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration, built once at startup and never mutated.
///
/// Load with `WatchdogConfig::load()` which searches:
/// 1. the explicit path (`--config`)
/// 2. `$STOREWATCH_CONFIG`
/// 3. `./storewatch.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// The monitored executable
    #[serde(default)]
    pub target: TargetConfig,

    /// Restart cycle policy
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Liveness reporting
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Persisted site identity
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Log sink
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the configuration came from, reported once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file.
    File(PathBuf),
    /// No file found; built-in defaults.
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl WatchdogConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides and validate.
    ///
    /// Runs before the log sink exists, so nothing is logged here; the
    /// returned [`ConfigSource`] is logged by the caller.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let (mut config, source) = match Self::resolve_path(explicit)? {
            Some(path) => (Self::parse_file(&path)?, ConfigSource::File(path)),
            None => (Self::default(), ConfigSource::Defaults),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok((config, source))
    }

    fn resolve_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        // 1. --config must exist when given
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            return Ok(Some(path.to_path_buf()));
        }

        // 2. $STOREWATCH_CONFIG
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(path);
            if !p.exists() {
                return Err(ConfigError::Missing(p));
            }
            return Ok(Some(p));
        }

        // 3. ./storewatch.toml
        let local = PathBuf::from(defaults::CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(None)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    ///
    /// `STOREWATCH_HEARTBEAT_URL` replaces `heartbeat.endpoint` when non-empty.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(defaults::HEARTBEAT_URL_ENV_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                self.heartbeat.endpoint = url.to_string();
            }
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate values that would make the daemon spin or never act.
    ///
    /// Rules:
    /// - Intervals and the heartbeat timeout must be > 0
    /// - The process name must be non-empty
    /// - The heartbeat endpoint must be an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.target.process_name.trim().is_empty() {
            errors.push("target.process_name: must not be empty".to_string());
        }
        if self.supervisor.restart_interval_secs == 0 {
            errors.push("supervisor.restart_interval_secs: must be > 0".to_string());
        }
        if self.heartbeat.interval_secs == 0 {
            errors.push("heartbeat.interval_secs: must be > 0".to_string());
        }
        if self.heartbeat.timeout_secs == 0 {
            errors.push("heartbeat.timeout_secs: must be > 0".to_string());
        }
        let endpoint = self.heartbeat.endpoint.as_str();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            errors.push(format!(
                "heartbeat.endpoint: expected an http(s) URL, got {endpoint:?}"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Target
// ============================================================================

/// The single monitored executable and how to find it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// Image name, matched case-insensitively against running processes and
    /// case-sensitively against file names during the scan.
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Checked first; the scan only runs when this file is absent.
    #[serde(default = "default_executable_path")]
    pub default_path: PathBuf,

    /// Root of the fallback scan.
    #[serde(default = "default_scan_root")]
    pub scan_root: PathBuf,

    /// Directory depth limit for the scan (`0` = root only).
    #[serde(default = "default_scan_max_depth")]
    pub scan_max_depth: usize,

    /// Scan time budget in seconds; `0` disables the budget.
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
}

fn default_process_name() -> String {
    defaults::PROCESS_NAME.to_string()
}
fn default_executable_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_EXECUTABLE_PATH)
}
fn default_scan_root() -> PathBuf {
    PathBuf::from(defaults::SCAN_ROOT)
}
fn default_scan_max_depth() -> usize {
    defaults::SCAN_MAX_DEPTH
}
fn default_scan_timeout_secs() -> u64 {
    defaults::SCAN_TIMEOUT_SECS
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            default_path: default_executable_path(),
            scan_root: default_scan_root(),
            scan_max_depth: default_scan_max_depth(),
            scan_timeout_secs: default_scan_timeout_secs(),
        }
    }
}

impl TargetConfig {
    pub fn scan_timeout(&self) -> Option<Duration> {
        (self.scan_timeout_secs > 0).then(|| Duration::from_secs(self.scan_timeout_secs))
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Restart cycle policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Sleep between restart cycles (seconds).
    #[serde(default = "default_restart_interval_secs")]
    pub restart_interval_secs: u64,

    /// Skip the launch when any kill in the cycle failed.
    ///
    /// Off by default: the daemon always relaunches, accepting a duplicate
    /// instance until the next cycle kills both.
    #[serde(default)]
    pub require_kill_confirmation: bool,
}

fn default_restart_interval_secs() -> u64 {
    defaults::RESTART_INTERVAL_SECS
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_interval_secs: default_restart_interval_secs(),
            require_kill_confirmation: false,
        }
    }
}

impl SupervisorConfig {
    pub fn restart_interval(&self) -> Duration {
        Duration::from_secs(self.restart_interval_secs)
    }
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Liveness reporting to the collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Collector URL. Overridden by `STOREWATCH_HEARTBEAT_URL`.
    #[serde(default = "default_heartbeat_endpoint")]
    pub endpoint: String,

    /// Sleep between attempts (seconds).
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,

    /// Per-request timeout (seconds).
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_heartbeat_endpoint() -> String {
    defaults::HEARTBEAT_ENDPOINT.to_string()
}
fn default_heartbeat_interval_secs() -> u64 {
    defaults::HEARTBEAT_INTERVAL_SECS
}
fn default_heartbeat_timeout_secs() -> u64 {
    defaults::HEARTBEAT_TIMEOUT_SECS
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_heartbeat_endpoint(),
            interval_secs: default_heartbeat_interval_secs(),
            timeout_secs: default_heartbeat_timeout_secs(),
        }
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Identity / Logging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConfig {
    /// JSON file holding `{"loja_id": ...}`.
    #[serde(default = "default_identity_path")]
    pub path: PathBuf,
}

fn default_identity_path() -> PathBuf {
    PathBuf::from(defaults::IDENTITY_FILE)
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            path: default_identity_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Append-only text log.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(defaults::LOG_FILE)
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
