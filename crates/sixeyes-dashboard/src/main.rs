//! # Sixeyes Dashboard
//!
//! ## Usage
//!
//! ```sh,ignore
//! cargo run --release -p sixeyes-dashboard -- --base-url http://localhost:9090 watch
//! cargo run --release -p sixeyes-dashboard -- add "magnet:?xt=urn:btih:..."
//! ```

mod cli;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
#[cfg(test)]
use httpmock as _;
use serde as _;
use thiserror as _;
use tokio::{
    signal::unix::{SignalKind, signal},
    task::JoinHandle,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sixeyes_dashboard::{DashboardError, Request, connect, execute, log_revision};
use sixeyes_torrent_controller::{RestClient, Synchronizer};

use crate::cli::Cli;

/// Initializes the tracing subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Spawns and returns the signals listener task.
fn spawn_signal_listener() -> Result<JoinHandle<()>, DashboardError> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let signals = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    });

    Ok(signals)
}

/// Polls until a signal arrives, logging every revision of the read model.
async fn watch(sync: Arc<Synchronizer<RestClient>>) -> Result<(), DashboardError> {
    let mut signals = spawn_signal_listener()?;
    let mut revisions = sync.subscribe();
    let poller = sync.start();

    loop {
        tokio::select! {
            _ = &mut signals => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = *revisions.borrow_and_update();
                log_revision(&*sync, revision);
            }
        }
    }

    poller.stop().await;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), DashboardError> {
    let config = cli.config();
    info!("{config:?}");
    let sync = connect(&config)?;

    match cli.request() {
        Request::Watch => watch(sync).await,
        request => {
            let output = execute(&*sync, request).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
