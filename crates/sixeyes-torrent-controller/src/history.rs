//! Bounded history of network speed samples, oldest first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sixeyes_torrent_types::{SnapshotSource, SystemSnapshot};

/// Default number of samples kept.
pub const DEFAULT_HISTORY_LEN: usize = 10;

/// One point of the speed chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedSample {
    /// When the snapshot was taken.
    pub sampled_at: DateTime<Utc>,
    /// Download rate in MB/s.
    pub download: f64,
    /// Upload rate in MB/s.
    pub upload: f64,
    /// Whether the point is live or synthesized.
    pub source: SnapshotSource,
}

/// Ring buffer of [`SpeedSample`]s.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedHistory {
    capacity: usize,
    samples: VecDeque<SpeedSample>,
}

impl SpeedHistory {
    /// An empty history keeping at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends the network rates of `snapshot`, dropping the oldest sample when full.
    pub fn record(&mut self, snapshot: &SystemSnapshot) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(SpeedSample {
            sampled_at: snapshot.sampled_at,
            download: snapshot.network.download_speed,
            upload: snapshot.network.upload_speed,
            source: snapshot.source,
        });
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &SpeedSample> {
        self.samples.iter()
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&SpeedSample> {
        self.samples.back()
    }

    /// Highest download rate in the window.
    pub fn peak_download(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.download).reduce(f64::max)
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SpeedHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}
