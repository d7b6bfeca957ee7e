//! Decoding of backend payloads into `sixeyes_torrent_types`.
//!
//! The backend is loose about its JSON: ids arrive as numbers or strings, titles and
//! statuses are null until the engine has metadata, progress is fractional and speeds
//! come either preformatted (`12.34MB/s`) or as bare numbers. The wire structs below
//! accept all of that and the conversions normalize it into the strict domain types.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use tracing::warn;
use url::Url;

use sixeyes_torrent_types::{
    BackendError, CALCULATING_ETA, CompletedEntry, NetworkRates, SnapshotSource, StorageUsage,
    SystemSnapshot, Torrent, TorrentId, TorrentStatus, ZERO_SPEED, format_speed, parse_speed,
};

const UNKNOWN: &str = "Unknown";

/// A JSON value that may be sent either as a string or as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Number(Number),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Text(text) => text,
            Scalar::Number(number) => number.to_string(),
        }
    }
}

/// Torrent record as sent by the backend.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTorrent {
    pub(crate) id: Option<Scalar>,
    pub(crate) title: Option<String>,
    pub(crate) magnet: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) progress: Option<f64>,
    pub(crate) size: Option<Scalar>,
    pub(crate) download_speed: Option<Scalar>,
    pub(crate) upload_speed: Option<Scalar>,
    pub(crate) peers: Option<f64>,
    pub(crate) eta: Option<String>,
}

impl WireTorrent {
    /// Builds the provisional record inserted after a successful add.
    ///
    /// Fields the backend has not filled in yet get the values a freshly queued download
    /// would show.
    pub(crate) fn into_provisional(self, magnet: &str) -> Result<Torrent, BackendError> {
        let title = magnet_display_name(magnet).unwrap_or_else(|| "New Torrent".to_string());
        let mut torrent = self.into_torrent(title)?;
        if torrent.eta.is_none() && !torrent.is_complete() {
            torrent.eta = Some(CALCULATING_ETA.to_string());
        }
        Ok(torrent)
    }

    fn into_torrent(self, fallback_title: String) -> Result<Torrent, BackendError> {
        let id = self
            .id
            .map(|id| TorrentId::new(id.into_text()))
            .ok_or_else(|| BackendError::Decode("torrent record carried no id".into()))?;

        Ok(Torrent {
            status: decode_status(self.status.as_deref(), &id),
            id,
            title: self
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or(fallback_title),
            progress: progress_percent(self.progress),
            size: self.size.map(size_text).unwrap_or_else(|| UNKNOWN.to_string()),
            download_speed: speed_text(self.download_speed),
            upload_speed: speed_text(self.upload_speed),
            peers: self.peers.map(|peers| peers.max(0.0) as u32).unwrap_or(0),
            eta: self.eta.filter(|eta| !eta.trim().is_empty()),
        })
    }
}

impl TryFrom<WireTorrent> for Torrent {
    type Error = BackendError;

    fn try_from(wire: WireTorrent) -> Result<Self, Self::Error> {
        wire.into_torrent(UNKNOWN.to_string())
    }
}

/// Completed download as sent by the backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCompleted {
    pub(crate) id: Option<Scalar>,
    pub(crate) title: Option<String>,
    pub(crate) size: Option<Scalar>,
    pub(crate) completed_at: Option<String>,
}

impl TryFrom<WireCompleted> for CompletedEntry {
    type Error = BackendError;

    fn try_from(wire: WireCompleted) -> Result<Self, Self::Error> {
        let id = wire
            .id
            .map(|id| TorrentId::new(id.into_text()))
            .ok_or_else(|| BackendError::Decode("completed entry carried no id".into()))?;

        Ok(Self {
            id,
            title: wire
                .title
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            size: wire.size.map(size_text).unwrap_or_else(|| UNKNOWN.to_string()),
            completed_at: wire.completed_at.unwrap_or_default(),
        })
    }
}

/// System info payload: `{storage: {...}, network: {...}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct WireSystemInfo {
    pub(crate) storage: WireStorage,
    #[serde(default)]
    pub(crate) network: WireNetwork,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStorage {
    pub(crate) total: Option<f64>,
    pub(crate) used: f64,
    pub(crate) available: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireNetwork {
    pub(crate) download_speed: Option<f64>,
    pub(crate) upload_speed: Option<f64>,
}

impl WireSystemInfo {
    pub(crate) fn into_snapshot(self, sampled_at: DateTime<Utc>) -> SystemSnapshot {
        let WireStorage {
            total,
            used,
            available,
        } = self.storage;

        SystemSnapshot {
            storage: StorageUsage {
                total: total.unwrap_or(used + available),
                used,
                available,
            },
            network: NetworkRates {
                download_speed: self.network.download_speed.unwrap_or(0.0),
                upload_speed: self.network.upload_speed.unwrap_or(0.0),
            },
            source: SnapshotSource::Live,
            sampled_at,
        }
    }
}

/// Decodes the body returned by the add endpoint.
///
/// The backend either answers with the created record, or with its whole torrent map keyed
/// by id. In the latter case the newest entry whose magnet matches the submitted link wins,
/// else the highest id.
pub(crate) fn decode_added(body: Value, magnet: &str) -> Result<Torrent, BackendError> {
    let map = match body {
        Value::Object(map) => map,
        other => {
            return Err(BackendError::Decode(format!(
                "expected a torrent record, got {other}"
            )));
        }
    };

    if map.contains_key("id") {
        let wire: WireTorrent = serde_json::from_value(Value::Object(map))
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        return wire.into_provisional(magnet);
    }

    let (key, mut wire) = pick_keyed(map, magnet)?;
    if wire.id.is_none() {
        wire.id = Some(Scalar::Text(key));
    }
    wire.into_provisional(magnet)
}

fn pick_keyed(map: Map<String, Value>, magnet: &str) -> Result<(String, WireTorrent), BackendError> {
    let mut records = Vec::with_capacity(map.len());
    for (key, value) in map {
        let wire: WireTorrent =
            serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))?;
        records.push((key, wire));
    }

    // The backend accepts a magnet it already lists; ids only grow, so the newest match wins.
    let matches_magnet =
        |(_, wire): &(String, WireTorrent)| wire.magnet.as_deref() == Some(magnet);
    if records.iter().any(matches_magnet) {
        records.retain(matches_magnet);
    }

    records
        .into_iter()
        .max_by(|(a, _), (b, _)| key_order(a, b))
        .ok_or_else(|| BackendError::Decode("add response carried no torrent".into()))
}

/// Numeric keys compare as numbers, anything else lexically.
fn key_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn decode_status(status: Option<&str>, id: &TorrentId) -> TorrentStatus {
    match status {
        None => TorrentStatus::Downloading,
        Some(name) => name.parse().unwrap_or_else(|err| {
            warn!("Torrent {id}: {err}, showing it as errored");
            TorrentStatus::Error
        }),
    }
}

/// Whole percent, floored so that a torrent never reads as complete before it is.
fn progress_percent(progress: Option<f64>) -> u8 {
    progress.unwrap_or(0.0).clamp(0.0, 100.0).floor() as u8
}

fn speed_text(speed: Option<Scalar>) -> String {
    match speed {
        None => ZERO_SPEED.to_string(),
        Some(Scalar::Number(number)) => format_speed(number.as_f64().unwrap_or(0.0)),
        Some(Scalar::Text(text)) => parse_speed(&text).map(format_speed).unwrap_or(text),
    }
}

fn size_text(size: Scalar) -> String {
    match size {
        Scalar::Text(text) if text.trim().is_empty() => UNKNOWN.to_string(),
        Scalar::Text(text) => text,
        Scalar::Number(number) => format_bytes(number.as_f64().unwrap_or(0.0)),
    }
}

/// Formats a byte count as `4.7 GB`.
pub(crate) fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut magnitude = bytes.max(0.0);
    let mut unit = 0;
    while magnitude >= 1024.0 && unit < UNITS.len() - 1 {
        magnitude /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{magnitude:.0} {}", UNITS[unit])
    } else {
        format!("{magnitude:.1} {}", UNITS[unit])
    }
}

/// The `dn` (display name) parameter of a magnet link.
pub(crate) fn magnet_display_name(magnet: &str) -> Option<String> {
    let url = Url::parse(magnet).ok()?;
    if url.scheme() != "magnet" {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "dn")
        .map(|(_, value)| value.trim().to_string())
        .filter(|name| !name.is_empty())
}
