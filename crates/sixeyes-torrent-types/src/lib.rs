//! # Sixeyes Torrent Types
//!
//! This crate defines the domain types and the backend trait shared by the Sixeyes dashboard
//! crates. The torrent engine itself lives behind a REST service; everything here is a
//! read-model projection of what that service reports.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Display text for a torrent that is not transferring.
pub const ZERO_SPEED: &str = "0 MB/s";

/// ETA shown for a torrent that was just (re)started.
pub const CALCULATING_ETA: &str = "Calculating...";

/// Error type for backend operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response (connection refused, DNS, reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("server responded with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or canonical reason.
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The caller supplied input that is rejected before any request is sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The configured base URL cannot be used to build endpoint URLs.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Opaque, server-assigned torrent identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorrentId(String);

impl TorrentId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TorrentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TorrentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TorrentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle status of a torrent as reported by the backend.
///
/// This is a display projection; transitions are owned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TorrentStatus {
    /// Fetching pieces.
    Downloading,
    /// Fully downloaded and uploading to peers.
    Seeding,
    /// Paused by the user.
    Paused,
    /// The engine reported a failure.
    Error,
    /// Stopped by the user.
    Stopped,
    /// Finished and no longer seeding.
    Completed,
}

/// Returned when a status name is not one of the known variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown torrent status: {0}")]
pub struct UnknownStatus(pub String);

impl TorrentStatus {
    /// All variants, in display order.
    pub const ALL: [TorrentStatus; 6] = [
        TorrentStatus::Downloading,
        TorrentStatus::Seeding,
        TorrentStatus::Paused,
        TorrentStatus::Error,
        TorrentStatus::Stopped,
        TorrentStatus::Completed,
    ];

    /// The name used by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            TorrentStatus::Downloading => "Downloading",
            TorrentStatus::Seeding => "Seeding",
            TorrentStatus::Paused => "Paused",
            TorrentStatus::Error => "Error",
            TorrentStatus::Stopped => "Stopped",
            TorrentStatus::Completed => "Completed",
        }
    }

    /// Visual tone a front end should use for the status badge and progress bar.
    pub fn tone(self) -> StatusTone {
        match self {
            TorrentStatus::Downloading => StatusTone::Info,
            TorrentStatus::Seeding => StatusTone::Success,
            TorrentStatus::Paused => StatusTone::Warning,
            TorrentStatus::Error => StatusTone::Danger,
            TorrentStatus::Stopped => StatusTone::Muted,
            TorrentStatus::Completed => StatusTone::Success,
        }
    }

    /// Which controls are offered for a torrent in this status.
    pub fn controls(self) -> Controls {
        match self {
            TorrentStatus::Downloading | TorrentStatus::Seeding => Controls {
                pause: true,
                resume: false,
                stop: true,
                remove: true,
            },
            TorrentStatus::Paused => Controls {
                pause: false,
                resume: true,
                stop: true,
                remove: true,
            },
            TorrentStatus::Error | TorrentStatus::Stopped | TorrentStatus::Completed => {
                Controls {
                    pause: false,
                    resume: false,
                    stop: false,
                    remove: true,
                }
            }
        }
    }
}

impl fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TorrentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TorrentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

/// Visual tone of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub enum StatusTone {
    Info,
    Success,
    Warning,
    Danger,
    Muted,
}

/// Controls available for a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Controls {
    pub pause: bool,
    pub resume: bool,
    pub stop: bool,
    pub remove: bool,
}

/// An active torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Torrent {
    /// Server-assigned identifier.
    pub id: TorrentId,
    /// Display name.
    pub title: String,
    /// Current status.
    pub status: TorrentStatus,
    /// Whole percent, 0 to 100.
    pub progress: u8,
    /// Human readable size, e.g. `4.7 GB`.
    pub size: String,
    /// Display text of the form `<number> MB/s`.
    pub download_speed: String,
    /// Display text of the form `<number> MB/s`.
    pub upload_speed: String,
    /// Connected peers.
    pub peers: u32,
    /// Estimated time remaining; absent when paused, stopped or seeding.
    pub eta: Option<String>,
}

impl Torrent {
    /// Whether all pieces are present.
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }

    /// Download rate in MB/s, zero when the display text is not numeric.
    pub fn download_mbps(&self) -> f64 {
        parse_speed(&self.download_speed).unwrap_or(0.0)
    }

    /// Upload rate in MB/s, zero when the display text is not numeric.
    pub fn upload_mbps(&self) -> f64 {
        parse_speed(&self.upload_speed).unwrap_or(0.0)
    }
}

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedEntry {
    /// Identifier of the torrent that finished.
    pub id: TorrentId,
    /// Display name.
    pub title: String,
    /// Human readable size.
    pub size: String,
    /// Relative, human text such as `2 hours ago`.
    pub completed_at: String,
}

impl From<&Torrent> for CompletedEntry {
    fn from(torrent: &Torrent) -> Self {
        Self {
            id: torrent.id.clone(),
            title: torrent.title.clone(),
            size: torrent.size.clone(),
            completed_at: "just now".to_string(),
        }
    }
}

/// Disk figures, all in the same unit (GB on the observed backend).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct StorageUsage {
    pub total: f64,
    pub used: f64,
    pub available: f64,
}

impl StorageUsage {
    /// Share of `total` that is used, 0 when the total is unknown.
    pub fn used_percent(&self) -> f64 {
        if self.total > 0.0 {
            self.used / self.total * 100.0
        } else {
            0.0
        }
    }
}

/// Instantaneous network rates in MB/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NetworkRates {
    pub download_speed: f64,
    pub upload_speed: f64,
}

/// Where a [`SystemSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Reported by the backend.
    Live,
    /// Generated locally because the backend could not be reached.
    Synthetic,
}

/// System metrics sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    /// Disk usage.
    pub storage: StorageUsage,
    /// Network rates.
    pub network: NetworkRates,
    /// Live or synthetic.
    pub source: SnapshotSource,
    /// When the sample was taken or synthesized.
    pub sampled_at: DateTime<Utc>,
}

impl SystemSnapshot {
    /// Whether the sample was reported by the backend.
    pub fn is_live(&self) -> bool {
        self.source == SnapshotSource::Live
    }
}

/// Formats a MB/s rate as display text, e.g. `15.2 MB/s`.
pub fn format_speed(mbps: f64) -> String {
    let value = if mbps.is_finite() { mbps.max(0.0) } else { 0.0 };
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} MB/s")
}

/// Parses the leading number of a speed display text (`12.5 MB/s`, `12.5MB/s`, `12.5`).
pub fn parse_speed(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The REST surface of the torrent backend.
///
/// Implementations perform exactly one request per call and never touch local state.
#[async_trait]
pub trait TorrentBackend: Send + Sync {
    /// Submits a magnet link or torrent URL. Returns the record the backend created.
    async fn add(&self, magnet: &str) -> Result<Torrent, BackendError>;
    /// Lists the active torrents.
    async fn list(&self) -> Result<Vec<Torrent>, BackendError>;
    /// Lists finished downloads.
    async fn completed(&self) -> Result<Vec<CompletedEntry>, BackendError>;
    /// Pauses a torrent.
    async fn pause(&self, id: &TorrentId) -> Result<(), BackendError>;
    /// Resumes a paused torrent.
    async fn resume(&self, id: &TorrentId) -> Result<(), BackendError>;
    /// Stops a torrent.
    async fn stop(&self, id: &TorrentId) -> Result<(), BackendError>;
    /// Removes a torrent from the backend.
    async fn remove(&self, id: &TorrentId) -> Result<(), BackendError>;
    /// Fetches storage and network metrics.
    async fn system_info(&self) -> Result<SystemSnapshot, BackendError>;
}
