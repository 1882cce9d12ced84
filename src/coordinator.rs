//! Supervision Coordinator: startup wiring and the two long-lived loops.
//!
//! ```text
//! bootstrap:  IdentityStore ──► ExecutableLocator ──► Bootstrap
//! run:        tokio::spawn(HeartbeatReporter::run)     (background task)
//!             ProcessSupervisor::run                    (current task)
//! ```
//!
//! The loops share only the immutable [`SiteIdentity`]; neither can stop the
//! other. Both end when the cancellation token fires.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{ConfigError, ConfigSource, WatchdogConfig};
use crate::heartbeat::{HeartbeatReporter, HeartbeatTransport};
use crate::identity::{IdentityError, IdentityStore, SiteIdentity};
use crate::locator::{ExecutableFinder, ExecutableLocator, LocateError};
use crate::prompt::UserPrompt;
use crate::supervisor::{Launcher, ProcessSupervisor, ProcessTable};

pub const ERROR_TITLE: &str = "Error";
pub const NOTICE_TITLE: &str = "Monitoring";
pub const NOTICE_MESSAGE: &str =
    "Running in the background.\nYou can minimize or close this window.";

/// Fatal startup failures; the daemon exits non-zero on any of these.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("Executable lookup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything resolved once at startup.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub identity: SiteIdentity,
    pub executable: PathBuf,
}

/// Load the configuration, showing a failure through `prompt`.
pub fn load_config(
    explicit: Option<&Path>,
    prompt: &dyn UserPrompt,
) -> Result<(WatchdogConfig, ConfigSource), StartupError> {
    WatchdogConfig::load(explicit).map_err(|e| {
        prompt.show_error(ERROR_TITLE, &format!("{e}. Exiting."));
        e.into()
    })
}

/// [`resolve`], then the one-time "running in the background" notice.
pub async fn bootstrap<F>(
    config: &WatchdogConfig,
    prompt: &dyn UserPrompt,
    locator: ExecutableLocator<F>,
) -> Result<Bootstrap, StartupError>
where
    F: ExecutableFinder + 'static,
{
    let boot = resolve(config, prompt, locator).await?;
    prompt.show_info(NOTICE_TITLE, NOTICE_MESSAGE);
    Ok(boot)
}

/// Resolve identity, then the executable path.
///
/// Failures are shown through `prompt` before being returned. The locator runs
/// on a blocking thread since the fallback scan can walk a whole volume.
pub async fn resolve<F>(
    config: &WatchdogConfig,
    prompt: &dyn UserPrompt,
    locator: ExecutableLocator<F>,
) -> Result<Bootstrap, StartupError>
where
    F: ExecutableFinder + 'static,
{
    let identity = match IdentityStore::new(&config.identity.path).load_or_create(prompt) {
        Ok(identity) => identity,
        Err(e) => {
            error!(error = %e, "Site identity unavailable, exiting");
            prompt.show_error(ERROR_TITLE, &format!("{e}. Exiting."));
            return Err(e.into());
        }
    };

    let located = tokio::task::spawn_blocking(move || locator.locate()).await?;
    let executable = match located {
        Ok(path) => path,
        Err(e) => {
            prompt.show_error(
                ERROR_TITLE,
                &format!("Executable {} not found.", config.target.process_name),
            );
            return Err(e.into());
        }
    };

    Ok(Bootstrap {
        identity,
        executable,
    })
}

/// Run the heartbeat reporter in the background and the restart loop on the
/// current task until `cancel` fires.
pub async fn run<T, L, H>(
    supervisor: ProcessSupervisor<T, L>,
    reporter: HeartbeatReporter<H>,
    cancel: CancellationToken,
) where
    T: ProcessTable,
    L: Launcher,
    H: HeartbeatTransport + 'static,
{
    info!("Coordinator: starting heartbeat reporter and restart loop");

    let heartbeat_cancel = cancel.clone();
    let heartbeat = tokio::spawn(async move { reporter.run(heartbeat_cancel).await });

    let cycles = supervisor.run(cancel).await;

    match heartbeat.await {
        Ok(attempts) => info!(cycles, attempts, "Coordinator: both loops stopped"),
        Err(e) => warn!(cycles, error = %e, "Coordinator: heartbeat task ended abnormally"),
    }
}
