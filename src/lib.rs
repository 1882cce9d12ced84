//! storewatch: store service watchdog
//!
//! Keeps one point-of-sale service alive on a store machine and reports the
//! machine's liveness to a remote collector.
//!
//! ## Architecture
//!
//! - **Identity Store**: persisted store identifier, asked once on first run
//! - **Executable Locator**: default install path, bounded filesystem scan fallback
//! - **Process Supervisor**: forced Kill -> Launch cycle on a fixed interval
//! - **Heartbeat Reporter**: independent periodic POST to the collector
//! - **Coordinator**: bootstrap, then both loops until cancelled

pub mod config;
pub mod coordinator;
pub mod heartbeat;
pub mod identity;
pub mod locator;
pub mod logging;
pub mod prompt;
pub mod supervisor;

// Re-export configuration
pub use config::{ConfigError, ConfigSource, WatchdogConfig};

// Re-export the core components
pub use coordinator::{Bootstrap, StartupError};
pub use heartbeat::{HeartbeatReporter, HeartbeatResult, HeartbeatTransport, HttpTransport};
pub use identity::{IdentityError, IdentityStore, SiteIdentity};
pub use locator::{ExecutableFinder, ExecutableLocator, FilesystemScan, LocateError, ScanOutcome};
pub use prompt::{ConsolePrompt, UserPrompt};
pub use supervisor::{
    CycleReport, DetachedLauncher, LaunchOutcome, Launcher, ProcessEntry, ProcessSupervisor,
    ProcessTable, SysinfoProcessTable, TerminateOutcome,
};
