//! Locally synthesized system metrics, used when the backend cannot report its own.

use std::ops::Range;

use chrono::{DateTime, Utc};
use rand::Rng;

use sixeyes_torrent_types::{NetworkRates, SnapshotSource, StorageUsage, SystemSnapshot};

/// Fixed disk figures of a synthetic snapshot.
pub const SYNTHETIC_STORAGE: StorageUsage = StorageUsage {
    total: 1000.0,
    used: 750.0,
    available: 250.0,
};

/// Download rate range (MB/s) of a synthetic snapshot.
pub const SYNTHETIC_DOWNLOAD_RANGE: Range<f64> = 5.0..35.0;

/// Upload rate range (MB/s) of a synthetic snapshot.
pub const SYNTHETIC_UPLOAD_RANGE: Range<f64> = 2.0..12.0;

/// Builds a snapshot tagged [`SnapshotSource::Synthetic`].
pub fn synthesize_snapshot<R: Rng>(rng: &mut R, sampled_at: DateTime<Utc>) -> SystemSnapshot {
    SystemSnapshot {
        storage: SYNTHETIC_STORAGE,
        network: NetworkRates {
            download_speed: rng.random_range(SYNTHETIC_DOWNLOAD_RANGE),
            upload_speed: rng.random_range(SYNTHETIC_UPLOAD_RANGE),
        },
        source: SnapshotSource::Synthetic,
        sampled_at,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn synthetic_snapshot_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let snapshot = synthesize_snapshot(&mut rng, Utc::now());

            assert_eq!(snapshot.source, SnapshotSource::Synthetic);
            assert!(!snapshot.is_live());
            assert_eq!(
                snapshot.storage.used + snapshot.storage.available,
                snapshot.storage.total
            );
            assert!(SYNTHETIC_DOWNLOAD_RANGE.contains(&snapshot.network.download_speed));
            assert!(SYNTHETIC_UPLOAD_RANGE.contains(&snapshot.network.upload_speed));
        }
    }

    #[test]
    fn keeps_the_given_timestamp() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let snapshot = synthesize_snapshot(&mut StdRng::seed_from_u64(1), at);
        assert_eq!(snapshot.sampled_at, at);
    }
}
