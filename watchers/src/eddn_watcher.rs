//! # EDDN Watcher
//!
//! Connects to the EDDN relay and reports on the live feed in one of four
//! modes:
//!
//! - *(no flag)*: print every message.
//! - `--exploration`: print FSS discovery scans.
//! - `--new-systems`: announce first-discovered star systems and record them
//!   in `discovered_systems.txt` / `discovered_systems.json`.
//! - `--docking`: one line per docking request, grant, denial, cancel or timeout.
//!
//! Ctrl-C or SIGTERM stops the watcher cleanly.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;

use lib_common::configs::{load_config, Config};
use lib_common::loggers::loggerlocal::{setup_logging, LoggerLocalOptions};
use lib_common::{ConsoleReporter, Dispatcher, Mode, RelayIngestor, RelaySubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_config(Config::parse())?;

    let log_file = setup_logging(&LoggerLocalOptions {
        app_name: "eddn_watcher".to_string(),
        level: settings.log_level,
        log_dir: Some(settings.log_dir.clone()),
        ..Default::default()
    })?;
    if let Some(path) = log_file {
        log::debug!("Logging to {}", path.display());
    }
    log::info!("Starting EDDN watcher in {} mode.", settings.mode);

    let mut dispatcher = Dispatcher::open(
        settings.mode,
        &settings.data_dir,
        ConsoleReporter::stdout(),
    )
    .with_context(|| {
        format!(
            "Failed to open discovery store in {}",
            settings.data_dir.display()
        )
    })?;
    if let (Mode::NewSystems, Some(store)) = (dispatcher.mode(), dispatcher.store()) {
        log::info!("{} system(s) already recorded.", store.len());
    }

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    tokio::spawn(wait_for_shutdown(shutdown_tx));

    log::info!("Connecting to EDDN at {}...", settings.relay.endpoint);
    let Some(mut subscriber) =
        RelaySubscriber::connect_until(&settings.relay.endpoint, &mut shutdown_rx).await?
    else {
        log::info!("Connection closed.");
        return Ok(());
    };
    log::info!("Connected to EDDN. Waiting for messages...");

    let ingestor = RelayIngestor::new(settings.relay.recv_timeout);
    let result = ingestor
        .run(&mut subscriber, &mut dispatcher, shutdown_rx)
        .await;

    // Release the socket on every exit path before reporting.
    drop(subscriber);
    log::info!("Connection closed.");

    let summary = result.context("EDDN watcher stopped on a fatal error")?;
    log::info!(
        "Received {} message(s), skipped {}, {} idle timeout(s).",
        summary.frames,
        summary.skipped,
        summary.idle_timeouts
    );
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM and broadcasts a single shutdown.
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Cannot listen for SIGTERM: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    let _ = shutdown_tx.send(());
}
