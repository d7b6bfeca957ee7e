//! Fixed-interval polling of the backend.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    task::{JoinHandle, JoinSet},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use sixeyes_torrent_types::TorrentBackend;

use super::Synchronizer;

/// Shortest accepted poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to a running poller.
///
/// [`PollerHandle::stop`] cancels the timer and every in-flight poll and waits until they are
/// gone. Dropping the handle aborts the poller without waiting.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stops polling. No poll mutates state once this returns.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The loop may already be gone.
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!("Poller task failed: {err}");
                }
            }
        }
        info!("Poller stopped");
    }

    /// Whether the poll loop is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<B: TorrentBackend + 'static> Synchronizer<B> {
    /// Starts polling torrents, completed downloads and system metrics.
    ///
    /// The first round runs immediately. Each tick spawns the three polls independently, so
    /// they may overlap with each other, with later ticks and with commands; whichever
    /// response arrives last wins.
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let period = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let sync = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut polls = JoinSet::new();

            info!("Polling every {period:?}");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        debug!("Poll tick, {} polls in flight", polls.len());
                        sync.expire_notices();
                        let s = Arc::clone(&sync);
                        polls.spawn(async move {
                            s.refresh_torrents().await.ok();
                        });
                        let s = Arc::clone(&sync);
                        polls.spawn(async move {
                            s.refresh_completed().await.ok();
                        });
                        let s = Arc::clone(&sync);
                        polls.spawn(async move {
                            s.refresh_system_snapshot().await;
                        });
                    }
                    Some(joined) = polls.join_next(), if !polls.is_empty() => {
                        if let Err(err) = joined {
                            if err.is_panic() {
                                warn!("Poll task panicked: {err}");
                            }
                        }
                    }
                }
            }

            polls.shutdown().await;
        });

        PollerHandle {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }
}
