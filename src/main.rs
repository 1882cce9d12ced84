//! storewatch - store service watchdog
//!
//! Keeps the point-of-sale service running, force-restarts it every few hours
//! and sends a heartbeat with the store identifier to the collector.
//!
//! # Usage
//!
//! ```bash
//! # Run with storewatch.toml (or defaults) from the working directory
//! ./storewatch
//!
//! # Explicit config, verify bootstrap only
//! ./storewatch --config /etc/storewatch.toml --check
//! ```
//!
//! # Environment Variables
//!
//! - `STOREWATCH_CONFIG`: Path to the TOML config file
//! - `STOREWATCH_HEARTBEAT_URL`: Collector endpoint (overrides the config file)
//! - `RUST_LOG`: Logging filter (default: `logging.level`, `info`)
//!
//! A `.env` file in the working directory is loaded first.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use storewatch::{
    coordinator, logging, ConsolePrompt, DetachedLauncher, ExecutableLocator, HeartbeatReporter,
    HttpTransport, ProcessSupervisor, SysinfoProcessTable,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "storewatch")]
#[command(about = "Keeps the store service alive and reports heartbeats")]
#[command(version)]
struct CliArgs {
    /// Path to storewatch.toml (default: $STOREWATCH_CONFIG, then ./storewatch.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Resolve the store identity and executable path, print them, and exit
    #[arg(long)]
    check: bool,
}

// ============================================================================
// Shutdown
// ============================================================================

/// Cancel `token` on Ctrl+C (and SIGTERM on Unix).
fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(_) => {
                    tokio::signal::ctrl_c().await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        tokio::signal::ctrl_c().await.ok();

        info!("Received shutdown signal, stopping loops...");
        token.cancel();
    });
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    let prompt = ConsolePrompt::stdin();
    let (config, source) = coordinator::load_config(args.config.as_deref(), &prompt)
        .context("Failed to load configuration")?;

    logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  storewatch v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        config = %source,
        process = %config.target.process_name,
        endpoint = %config.heartbeat.endpoint,
        restart_interval_secs = config.supervisor.restart_interval_secs,
        heartbeat_interval_secs = config.heartbeat.interval_secs,
        "Configuration loaded"
    );

    let locator = ExecutableLocator::from_config(&config.target);

    if args.check {
        let boot = coordinator::resolve(&config, &prompt, locator)
            .await
            .context("Startup failed")?;
        println!("Store:      {}", boot.identity);
        println!("Executable: {}", boot.executable.display());
        return Ok(());
    }

    let boot = coordinator::bootstrap(&config, &prompt, locator)
        .await
        .context("Startup failed")?;

    let transport =
        HttpTransport::from_config(&config.heartbeat).context("Failed to build HTTP client")?;
    let reporter = HeartbeatReporter::new(boot.identity, transport, config.heartbeat.interval());
    let supervisor = ProcessSupervisor::new(
        &config,
        boot.executable,
        SysinfoProcessTable::new(),
        DetachedLauncher,
    );

    let cancel_token = CancellationToken::new();
    spawn_shutdown_listener(cancel_token.clone());

    coordinator::run(supervisor, reporter, cancel_token).await;

    info!("✓ storewatch shutdown complete");
    Ok(())
}
