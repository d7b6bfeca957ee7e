//! Aggregate figures shown at the top of the dashboard.

use std::fmt;

use serde::Serialize;

use sixeyes_torrent_types::TorrentStatus;

use crate::state::DashboardState;

/// Totals derived from a [`DashboardState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Sum of download rates of downloading torrents, MB/s.
    pub total_download: f64,
    /// Sum of upload rates of all torrents, MB/s.
    pub total_upload: f64,
    #[allow(missing_docs)]
    pub downloading: usize,
    #[allow(missing_docs)]
    pub seeding: usize,
    #[allow(missing_docs)]
    pub completed: usize,
    /// Used share of the disk, when a snapshot is available.
    pub disk_used_percent: Option<f64>,
}

impl DashboardSummary {
    /// Computes the summary of `state`.
    pub fn from_state(state: &DashboardState) -> Self {
        let torrents = state.torrents();
        let count = |status: TorrentStatus| torrents.iter().filter(|t| t.status == status).count();

        Self {
            total_download: torrents
                .iter()
                .filter(|t| t.status == TorrentStatus::Downloading)
                .map(|t| t.download_mbps())
                .sum(),
            total_upload: torrents.iter().map(|t| t.upload_mbps()).sum(),
            downloading: count(TorrentStatus::Downloading),
            seeding: count(TorrentStatus::Seeding),
            completed: state.completed().len(),
            disk_used_percent: state.system().map(|s| s.storage.used_percent()),
        }
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "down {:.1} MB/s, up {:.1} MB/s, {} downloading, {} seeding, {} completed",
            self.total_download, self.total_upload, self.downloading, self.seeding, self.completed
        )?;
        match self.disk_used_percent {
            Some(percent) => write!(f, ", disk {percent:.0}% used"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ServerUpdate, merge};
    use crate::testutil::{make_snapshot, make_torrent};

    #[test]
    fn totals_follow_status() {
        let mut downloading = make_torrent("1", TorrentStatus::Downloading, 40);
        downloading.download_speed = "15.2 MB/s".to_string();
        downloading.upload_speed = "2.1 MB/s".to_string();
        let mut seeding = make_torrent("2", TorrentStatus::Seeding, 100);
        seeding.download_speed = "9 MB/s".to_string();
        seeding.upload_speed = "5.8 MB/s".to_string();
        let mut paused = make_torrent("3", TorrentStatus::Paused, 10);
        paused.download_speed = "3 MB/s".to_string();

        let state = merge(
            DashboardState::default(),
            ServerUpdate::Torrents(vec![downloading, seeding, paused]),
        );
        let summary = DashboardSummary::from_state(&state);

        assert!((summary.total_download - 15.2).abs() < 1e-9);
        assert!((summary.total_upload - 7.9).abs() < 1e-9);
        assert_eq!(summary.downloading, 1);
        assert_eq!(summary.seeding, 1);
        assert_eq!(summary.disk_used_percent, None);
    }

    #[test]
    fn disk_percent_comes_from_snapshot() {
        let state = merge(
            DashboardState::default(),
            ServerUpdate::System(make_snapshot(1.0, 1.0)),
        );
        let summary = DashboardSummary::from_state(&state);

        assert_eq!(summary.disk_used_percent, Some(75.0));
        assert_eq!(
            summary.to_string(),
            "down 0.0 MB/s, up 0.0 MB/s, 0 downloading, 0 seeding, 0 completed, disk 75% used"
        );
    }
}
