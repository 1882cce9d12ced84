//! Process Supervisor: periodic forced restart of the monitored process.
//!
//! Each restart cycle runs two phases:
//!
//! 1. **Killing**: enumerate the OS process table and terminate every process
//!    whose image name matches (case-insensitive). A process that exits on its
//!    own in between counts as success; a failed kill is logged, not retried.
//! 2. **Launching**: start one detached instance of the executable, unless it
//!    vanished from disk (or, in strict mode, a kill failed).
//!
//! No process handle survives a cycle. Operators or the application itself may
//! restart it in between, so every cycle re-discovers instances by name.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::WatchdogConfig;

// ============================================================================
// Capabilities
// ============================================================================

/// A running process as seen by one enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Result of a single termination request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    Killed,
    /// Exited between enumeration and termination.
    AlreadyGone,
    Failed(String),
}

/// OS process table access.
pub trait ProcessTable: Send + Sync {
    /// Every running process whose name equals `name`, ignoring case.
    fn matching(&self, name: &str) -> Vec<ProcessEntry>;

    /// Forcefully terminate `pid`.
    fn terminate(&self, pid: u32) -> TerminateOutcome;
}

/// Starts the monitored executable.
pub trait Launcher: Send + Sync {
    /// Spawn a detached instance, returning its PID when the OS reports one.
    fn launch(&self, path: &Path) -> Result<Option<u32>, SupervisorError>;
}

impl<T: ProcessTable + ?Sized> ProcessTable for Arc<T> {
    fn matching(&self, name: &str) -> Vec<ProcessEntry> {
        (**self).matching(name)
    }

    fn terminate(&self, pid: u32) -> TerminateOutcome {
        (**self).terminate(pid)
    }
}

impl<L: Launcher + ?Sized> Launcher for Arc<L> {
    fn launch(&self, path: &Path) -> Result<Option<u32>, SupervisorError> {
        (**self).launch(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to start {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// sysinfo-backed process table
// ============================================================================

/// Process table backed by `sysinfo`.
pub struct SysinfoProcessTable {
    system: Mutex<System>,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn matching(&self, name: &str) -> Vec<ProcessEntry> {
        let wanted = name.to_lowercase();
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::new());

        let mut found: Vec<ProcessEntry> = system
            .processes()
            .iter()
            // Linux lists each thread as its own task; keep whole processes only.
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter_map(|(pid, process)| {
                let proc_name = process.name().to_string_lossy();
                (proc_name.to_lowercase() == wanted).then(|| ProcessEntry {
                    pid: pid.as_u32(),
                    name: proc_name.into_owned(),
                })
            })
            .collect();
        found.sort_by_key(|p| p.pid);
        found
    }

    fn terminate(&self, pid: u32) -> TerminateOutcome {
        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());

        let sent = match system.process(pid) {
            Some(process) => process.kill(),
            None => return TerminateOutcome::AlreadyGone,
        };
        if sent {
            return TerminateOutcome::Killed;
        }

        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        if system.process(pid).is_none() {
            TerminateOutcome::AlreadyGone
        } else {
            TerminateOutcome::Failed("kill request rejected by the OS".to_string())
        }
    }
}

// ============================================================================
// Detached launcher
// ============================================================================

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Spawns the executable with null stdio in its own process group, working
/// directory set to the executable's folder.
///
/// Uses `tokio::process` so exited children are reaped without holding the
/// handle; must be called from within a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLauncher;

impl Launcher for DetachedLauncher {
    fn launch(&self, path: &Path) -> Result<Option<u32>, SupervisorError> {
        let mut command = tokio::process::Command::new(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);
        #[cfg(windows)]
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);

        let child = command.spawn().map_err(|source| SupervisorError::Spawn {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(child.id())
    }
}

// ============================================================================
// Restart cycle
// ============================================================================

/// What the Launching phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Launched { pid: Option<u32> },
    /// The cached executable path no longer exists.
    ExecutableMissing,
    /// Strict mode: a kill failed, so no second instance was started.
    KillUnconfirmed,
    Failed(String),
}

/// Summary of one Kill -> Launch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub matched: usize,
    pub killed: usize,
    pub already_gone: usize,
    pub kill_failures: usize,
    pub launch: LaunchOutcome,
}

/// Owns the kill/relaunch schedule for one executable.
pub struct ProcessSupervisor<T, L> {
    process_name: String,
    executable: PathBuf,
    restart_interval: Duration,
    require_kill_confirmation: bool,
    table: T,
    launcher: L,
}

impl<T: ProcessTable, L: Launcher> ProcessSupervisor<T, L> {
    pub fn new(config: &WatchdogConfig, executable: PathBuf, table: T, launcher: L) -> Self {
        Self {
            process_name: config.target.process_name.clone(),
            executable,
            restart_interval: config.supervisor.restart_interval(),
            require_kill_confirmation: config.supervisor.require_kill_confirmation,
            table,
            launcher,
        }
    }

    /// Run one Kill -> Launch pass. Never fails; problems are logged and
    /// reflected in the report.
    pub fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport {
            matched: 0,
            killed: 0,
            already_gone: 0,
            kill_failures: 0,
            launch: LaunchOutcome::ExecutableMissing,
        };

        // Phase 1: Killing
        let running = self.table.matching(&self.process_name);
        report.matched = running.len();
        if running.is_empty() {
            info!(process = %self.process_name, "No running instance found");
        }

        for entry in &running {
            info!(process = %entry.name, pid = entry.pid, "Killing process");
            match self.table.terminate(entry.pid) {
                TerminateOutcome::Killed => {
                    report.killed += 1;
                    info!(process = %entry.name, pid = entry.pid, "Process terminated");
                }
                TerminateOutcome::AlreadyGone => {
                    report.already_gone += 1;
                    info!(process = %entry.name, pid = entry.pid, "Process no longer exists");
                }
                TerminateOutcome::Failed(reason) => {
                    report.kill_failures += 1;
                    warn!(process = %entry.name, pid = entry.pid, %reason, "Failed to terminate process");
                }
            }
        }

        // Phase 2: Launching
        report.launch = self.launch_phase(report.kill_failures);
        report
    }

    fn launch_phase(&self, kill_failures: usize) -> LaunchOutcome {
        info!(process = %self.process_name, "Starting process");

        if !self.executable.is_file() {
            error!(
                path = %self.executable.display(),
                "Executable path invalid, skipping launch this cycle"
            );
            return LaunchOutcome::ExecutableMissing;
        }

        if self.require_kill_confirmation && kill_failures > 0 {
            warn!(
                kill_failures,
                "Old instance not confirmed dead, skipping launch (require_kill_confirmation)"
            );
            return LaunchOutcome::KillUnconfirmed;
        }

        match self.launcher.launch(&self.executable) {
            Ok(pid) => {
                info!(path = %self.executable.display(), pid = ?pid, "Process started");
                LaunchOutcome::Launched { pid }
            }
            Err(e) => {
                error!(error = %e, "Failed to start process");
                LaunchOutcome::Failed(e.to_string())
            }
        }
    }

    /// Run restart cycles until `cancel` fires: the first immediately, then one
    /// per `restart_interval` of sleep after the previous cycle finished.
    ///
    /// Returns the number of cycles run.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!(
            process = %self.process_name,
            path = %self.executable.display(),
            interval_secs = self.restart_interval.as_secs(),
            "Supervisor started"
        );

        let mut cycles: u64 = 0;
        while !cancel.is_cancelled() {
            let report = self.run_cycle();
            cycles += 1;
            debug!(cycle = cycles, ?report, "Restart cycle complete");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.restart_interval) => {}
            }
        }

        info!(cycles, "Supervisor received shutdown signal");
        cycles
    }
}
