//! System-wide default constants.
//!
//! Every value here is the reference deployment's setting and the fallback
//! when `storewatch.toml` does not mention the key.

// ============================================================================
// Monitored Process
// ============================================================================

/// Image name of the monitored point-of-sale service.
pub const PROCESS_NAME: &str = "ServUni2.exe";

/// Install location checked before any filesystem scan.
#[cfg(windows)]
pub const DEFAULT_EXECUTABLE_PATH: &str = r"C:\ServUni2\ServUni2.exe";

/// Install location checked before any filesystem scan.
#[cfg(not(windows))]
pub const DEFAULT_EXECUTABLE_PATH: &str = "/opt/servuni2/ServUni2.exe";

/// Root of the fallback scan (the system volume).
#[cfg(windows)]
pub const SCAN_ROOT: &str = r"C:\";

/// Root of the fallback scan (the system volume).
#[cfg(not(windows))]
pub const SCAN_ROOT: &str = "/";

/// Maximum directory depth below the scan root.
pub const SCAN_MAX_DEPTH: usize = 24;

/// Time budget for the fallback scan (seconds). 900 = 15 minutes.
pub const SCAN_TIMEOUT_SECS: u64 = 900;

// ============================================================================
// Schedules
// ============================================================================

/// Sleep between the end of one restart cycle and the start of the next
/// (seconds). 10 800 = 3 hours.
pub const RESTART_INTERVAL_SECS: u64 = 10_800;

/// Sleep between heartbeat attempts (seconds).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 120;

// ============================================================================
// Heartbeat
// ============================================================================

/// Collector endpoint receiving `{"loja_id": ...}`.
pub const HEARTBEAT_ENDPOINT: &str = "http://localhost:3000/heartbeat";

/// Per-request HTTP timeout (seconds).
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Files
// ============================================================================

/// Persisted site identity (`{"loja_id": ...}`).
pub const IDENTITY_FILE: &str = "config.json";

/// Append-only diagnostic log.
pub const LOG_FILE: &str = "log.txt";

/// Daemon configuration looked up in the working directory.
pub const CONFIG_FILE: &str = "storewatch.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "STOREWATCH_CONFIG";

/// Environment variable overriding `heartbeat.endpoint`.
pub const HEARTBEAT_URL_ENV_VAR: &str = "STOREWATCH_HEARTBEAT_URL";
