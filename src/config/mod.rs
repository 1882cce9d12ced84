//! Watchdog Configuration Module
//!
//! Replaces hardcoded paths, intervals and URLs with a single immutable
//! [`WatchdogConfig`] loaded from TOML at startup.
//!
//! ## Loading Order
//!
//! 1. `--config <PATH>` on the command line
//! 2. `STOREWATCH_CONFIG` environment variable (path to TOML file)
//! 3. `storewatch.toml` in the current working directory
//! 4. Built-in defaults (the reference deployment's values)
//!
//! After loading, `STOREWATCH_HEARTBEAT_URL` (also read from `.env`) overrides
//! the heartbeat endpoint.
//!
//! ## Usage
//!
//! ```ignore
//! let (config, source) = WatchdogConfig::load(args.config.as_deref())?;
//! let supervisor = ProcessSupervisor::new(&config, path, table, launcher);
//! ```
//!
//! The config is passed by reference into each component; there is no
//! global accessor.

mod watchdog_config;
pub mod defaults;

pub use watchdog_config::*;
