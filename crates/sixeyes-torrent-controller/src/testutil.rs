//! Shared test utilities and fixtures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sixeyes_torrent_types::{
    BackendError, CompletedEntry, NetworkRates, SnapshotSource, StorageUsage, SystemSnapshot,
    Torrent, TorrentBackend, TorrentId, TorrentStatus, ZERO_SPEED,
};

mockall::mock! {
    pub Backend {}

    #[async_trait]
    impl TorrentBackend for Backend {
        async fn add(&self, magnet: &str) -> Result<Torrent, BackendError>;
        async fn list(&self) -> Result<Vec<Torrent>, BackendError>;
        async fn completed(&self) -> Result<Vec<CompletedEntry>, BackendError>;
        async fn pause(&self, id: &TorrentId) -> Result<(), BackendError>;
        async fn resume(&self, id: &TorrentId) -> Result<(), BackendError>;
        async fn stop(&self, id: &TorrentId) -> Result<(), BackendError>;
        async fn remove(&self, id: &TorrentId) -> Result<(), BackendError>;
        async fn system_info(&self) -> Result<SystemSnapshot, BackendError>;
    }
}

pub(crate) fn make_torrent(id: &str, status: TorrentStatus, progress: u8) -> Torrent {
    let active = matches!(status, TorrentStatus::Downloading);
    Torrent {
        id: TorrentId::new(id),
        title: format!("torrent-{id}"),
        status,
        progress,
        size: "4.7 GB".to_string(),
        download_speed: if active { "12.5 MB/s" } else { ZERO_SPEED }.to_string(),
        upload_speed: if active { "1.5 MB/s" } else { ZERO_SPEED }.to_string(),
        peers: 12,
        eta: active.then(|| "10m".to_string()),
    }
}

pub(crate) fn make_completed(id: &str) -> CompletedEntry {
    CompletedEntry {
        id: TorrentId::new(id),
        title: format!("torrent-{id}"),
        size: "312 MB".to_string(),
        completed_at: "2 hours ago".to_string(),
    }
}

pub(crate) fn make_snapshot(download: f64, upload: f64) -> SystemSnapshot {
    SystemSnapshot {
        storage: StorageUsage {
            total: 1000.0,
            used: 750.0,
            available: 250.0,
        },
        network: NetworkRates {
            download_speed: download,
            upload_speed: upload,
        },
        source: SnapshotSource::Live,
        sampled_at: fixed_time(),
    }
}

pub(crate) fn fixed_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

pub(crate) fn network_error() -> BackendError {
    BackendError::Network("connection refused".to_string())
}
