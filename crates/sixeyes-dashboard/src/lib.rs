//! # Sixeyes Dashboard
//!
//! Headless dashboard for the Sixeyes torrent backend. The binary either watches the backend,
//! logging a summary whenever the read model changes, or runs a single command and prints
//! the result as JSON.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sixeyes_dashboard::{DashboardConfig, Request, connect, execute};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sync = connect(&DashboardConfig::default())?;
//!     let output = execute(&*sync, Request::List).await?;
//!     println!("{output}");
//!     Ok(())
//! }
//! ```

use std::{fmt, sync::Arc, time::Duration};

use clap as _;
use dotenvy as _;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio as _;
use tracing::{debug, info};
use tracing_subscriber as _;

use sixeyes_torrent_controller::{RestClient, SyncConfig, Synchronizer};
use sixeyes_torrent_types::{BackendError, TorrentBackend, TorrentId};

/// Default backend location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9090";

/// Error variants of the dashboard.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Output could not be serialized.
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    /// Represents a generic I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings of a dashboard session.
#[derive(Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Backend base URL.
    pub base_url: String,
    /// Time between two polls.
    pub poll_interval: Duration,
    /// Locally promoted completions kept.
    pub completed_limit: usize,
}

impl DashboardConfig {
    /// Synchronizer settings for this session.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: self.poll_interval,
            completed_limit: self.completed_limit,
            ..SyncConfig::default()
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: sync.poll_interval,
            completed_limit: sync.completed_limit,
        }
    }
}

impl fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dashboard(base_url=\"{}\", poll_interval={:?}, completed_limit={})",
            self.base_url, self.poll_interval, self.completed_limit
        )
    }
}

/// What the dashboard was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Poll until interrupted.
    Watch,
    /// Print the active torrents.
    List,
    /// Print the completed downloads.
    Completed,
    /// Print a system snapshot.
    System,
    /// Add a magnet link or torrent URL.
    Add(String),
    #[allow(missing_docs)]
    Pause(TorrentId),
    #[allow(missing_docs)]
    Resume(TorrentId),
    #[allow(missing_docs)]
    Stop(TorrentId),
    #[allow(missing_docs)]
    Remove(TorrentId),
}

/// Builds a synchronizer backed by the REST client of `config`.
pub fn connect(config: &DashboardConfig) -> Result<Arc<Synchronizer<RestClient>>, DashboardError> {
    let client = RestClient::try_new(&config.base_url)?;
    info!("Connecting to {}", client.base_url());
    Ok(Arc::new(Synchronizer::new(client, config.sync_config())))
}

/// Runs a one-shot request and returns its JSON output.
///
/// [`Request::Watch`] is not a one-shot request; it yields the current read model.
pub async fn execute<B: TorrentBackend>(
    sync: &Synchronizer<B>,
    request: Request,
) -> Result<Value, DashboardError> {
    let output = match request {
        Request::Watch => to_value(&sync.state())?,
        Request::List => {
            sync.refresh_torrents().await?;
            to_value(&sync.torrents())?
        }
        Request::Completed => {
            sync.refresh_completed().await?;
            to_value(&sync.completed())?
        }
        Request::System => to_value(&sync.refresh_system_snapshot().await)?,
        Request::Add(magnet) => to_value(&sync.add_torrent(&magnet).await?)?,
        Request::Pause(id) => {
            refresh_before_command(sync).await;
            sync.pause_torrent(&id).await?;
            record_or_ack(sync, &id, "paused")?
        }
        Request::Resume(id) => {
            refresh_before_command(sync).await;
            sync.resume_torrent(&id).await?;
            record_or_ack(sync, &id, "resumed")?
        }
        Request::Stop(id) => {
            refresh_before_command(sync).await;
            sync.stop_torrent(&id).await?;
            record_or_ack(sync, &id, "stopped")?
        }
        Request::Remove(id) => {
            refresh_before_command(sync).await;
            sync.remove_torrent(&id).await?;
            json!({ "id": id, "result": "removed" })
        }
    };

    Ok(output)
}

/// The command still goes out when the refresh fails; the failure is already a notice.
async fn refresh_before_command<B: TorrentBackend>(sync: &Synchronizer<B>) {
    if let Err(err) = sync.refresh_torrents().await {
        debug!("Refresh before command failed: {err}");
    }
}

fn record_or_ack<B: TorrentBackend>(
    sync: &Synchronizer<B>,
    id: &TorrentId,
    result: &str,
) -> Result<Value, DashboardError> {
    match sync.state().torrent(id) {
        Some(torrent) => to_value(torrent),
        None => Ok(json!({ "id": id, "result": result })),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, DashboardError> {
    Ok(serde_json::to_value(value)?)
}

/// Logs the summary line and the active notices of `sync`.
pub fn log_revision<B: TorrentBackend>(sync: &Synchronizer<B>, revision: u64) {
    info!("[{revision}] {}", sync.summary());
    for torrent in sync.torrents() {
        debug!(
            "  {} {} {}% {} down {} up, eta {}",
            torrent.id,
            torrent.status,
            torrent.progress,
            torrent.download_speed,
            torrent.upload_speed,
            torrent.eta.as_deref().unwrap_or("-")
        );
    }
    for notice in sync.notices() {
        info!("  notice: {notice}");
    }
}
