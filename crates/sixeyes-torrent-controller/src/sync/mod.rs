//! The torrent state synchronizer.
//!
//! A [`Synchronizer`] owns the local read model. Refresh operations pull server state into it;
//! command operations forward a request to the backend and, once it succeeds, apply the
//! optimistic transition. Failures never touch the read model: they are logged, raised as a
//! [`Notice`] and handed back to the caller.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng};
use tokio::{sync::watch, time::Instant};
use tracing::{debug, info, warn};

use sixeyes_torrent_types::{
    BackendError, CompletedEntry, SystemSnapshot, Torrent, TorrentBackend, TorrentId,
};

use crate::{
    fallback::synthesize_snapshot,
    history::DEFAULT_HISTORY_LEN,
    notice::{Action, DEFAULT_NOTICE_TTL, Notice, NoticeBoard},
    state::{Command, DEFAULT_COMPLETED_LIMIT, DashboardState, ServerUpdate, apply_optimistic, merge},
    summary::DashboardSummary,
};

mod poller;

pub use poller::PollerHandle;


/// Default time between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Tuning knobs of a [`Synchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time between two poll rounds.
    pub poll_interval: Duration,
    /// Locally promoted completions kept.
    pub completed_limit: usize,
    /// Speed samples kept.
    pub history_len: usize,
    /// Lifetime of a notice.
    pub notice_ttl: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            completed_limit: DEFAULT_COMPLETED_LIMIT,
            history_len: DEFAULT_HISTORY_LEN,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

/// Keeps a local view of a [`TorrentBackend`] approximately in sync with the server.
///
/// All methods take `&self`; wrap the synchronizer in an `Arc` to share it with the poller
/// and with the code issuing commands.
pub struct Synchronizer<B> {
    backend: B,
    config: SyncConfig,
    state: Mutex<DashboardState>,
    notices: Mutex<NoticeBoard>,
    rng: Mutex<StdRng>,
    revision: watch::Sender<u64>,
}

impl<B> fmt::Debug for Synchronizer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("config", &self.config)
            .field("revision", &*self.revision.borrow())
            .finish_non_exhaustive()
    }
}

impl<B: TorrentBackend> Synchronizer<B> {
    /// Creates a synchronizer with an empty read model.
    pub fn new(backend: B, config: SyncConfig) -> Self {
        Self::with_rng(backend, config, StdRng::from_rng(&mut rand::rng()))
    }

    /// Like [`Synchronizer::new`], with the generator used for synthetic metrics.
    pub fn with_rng(backend: B, config: SyncConfig, rng: StdRng) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            backend,
            config,
            state: Mutex::new(DashboardState::new(
                config.completed_limit,
                config.history_len,
            )),
            notices: Mutex::new(NoticeBoard::new(config.notice_ttl)),
            rng: Mutex::new(rng),
            revision,
        }
    }

    #[allow(missing_docs)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// A copy of the current read model.
    pub fn state(&self) -> DashboardState {
        lock(&self.state).clone()
    }

    /// Active torrents.
    pub fn torrents(&self) -> Vec<Torrent> {
        lock(&self.state).torrents().to_vec()
    }

    /// Finished downloads.
    pub fn completed(&self) -> Vec<CompletedEntry> {
        lock(&self.state).completed().to_vec()
    }

    /// Totals of the current read model.
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::from_state(&lock(&self.state))
    }

    /// Notices that have not expired yet.
    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).active(Instant::now())
    }

    /// Drops expired notices, bumping the revision when any went away.
    pub fn expire_notices(&self) -> usize {
        let expired = lock(&self.notices).prune(Instant::now());
        if expired > 0 {
            debug!("{expired} notices expired");
            self.bump();
        }
        expired
    }

    /// Receives the revision number, bumped on every change of state or notices.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Replaces the active torrents with the server's list.
    pub async fn refresh_torrents(&self) -> Result<(), BackendError> {
        match self.backend.list().await {
            Ok(torrents) => {
                debug!("Applying {} torrents", torrents.len());
                self.apply(|state| merge(state, ServerUpdate::Torrents(torrents)));
                Ok(())
            }
            Err(err) => Err(self.report(Action::LoadTorrents, err)),
        }
    }

    /// Replaces the completed list with the server's list.
    pub async fn refresh_completed(&self) -> Result<(), BackendError> {
        match self.backend.completed().await {
            Ok(entries) => {
                debug!("Applying {} completed entries", entries.len());
                self.apply(|state| merge(state, ServerUpdate::Completed(entries)));
                Ok(())
            }
            Err(err) => Err(self.report(Action::LoadCompleted, err)),
        }
    }

    /// Fetches system metrics, synthesizing them when the backend cannot be read.
    ///
    /// Never fails; the returned snapshot says whether it is live.
    pub async fn refresh_system_snapshot(&self) -> SystemSnapshot {
        let snapshot = match self.backend.system_info().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let err = self.report(Action::LoadSystemInfo, err);
                debug!("Using synthetic system metrics after: {err}");
                synthesize_snapshot(&mut *lock(&self.rng), Utc::now())
            }
        };

        let update = ServerUpdate::System(snapshot.clone());
        self.apply(|state| merge(state, update));
        snapshot
    }

    /// Submits a magnet link or torrent URL and inserts the provisional record.
    pub async fn add_torrent(&self, magnet_or_url: &str) -> Result<Torrent, BackendError> {
        let link = magnet_or_url.trim();
        if link.is_empty() {
            let err = BackendError::InvalidInput("magnet link or URL is empty".to_string());
            return Err(self.report(Action::Add, err));
        }

        match self.backend.add(link).await {
            Ok(torrent) => {
                info!("Added torrent {} ({})", torrent.id, torrent.title);
                self.apply(|state| apply_optimistic(state, Command::Add(torrent.clone())));
                Ok(torrent)
            }
            Err(err) => Err(self.report(Action::Add, err)),
        }
    }

    /// Pauses a torrent.
    pub async fn pause_torrent(&self, id: &TorrentId) -> Result<(), BackendError> {
        let result = self.backend.pause(id).await;
        self.conclude(Action::Pause, result, Command::Pause(id.clone()))
    }

    /// Resumes a torrent.
    pub async fn resume_torrent(&self, id: &TorrentId) -> Result<(), BackendError> {
        let result = self.backend.resume(id).await;
        self.conclude(Action::Resume, result, Command::Resume(id.clone()))
    }

    /// Stops a torrent.
    pub async fn stop_torrent(&self, id: &TorrentId) -> Result<(), BackendError> {
        let result = self.backend.stop(id).await;
        self.conclude(Action::Stop, result, Command::Stop(id.clone()))
    }

    /// Removes a torrent.
    pub async fn remove_torrent(&self, id: &TorrentId) -> Result<(), BackendError> {
        let result = self.backend.remove(id).await;
        self.conclude(Action::Remove, result, Command::Remove(id.clone()))
    }

    fn conclude(
        &self,
        action: Action,
        result: Result<(), BackendError>,
        command: Command,
    ) -> Result<(), BackendError> {
        match result {
            Ok(()) => {
                info!("Backend accepted {action}: {command:?}");
                self.apply(|state| apply_optimistic(state, command));
                Ok(())
            }
            Err(err) => Err(self.report(action, err)),
        }
    }

    fn apply(&self, op: impl FnOnce(DashboardState) -> DashboardState) {
        {
            let mut state = lock(&self.state);
            let current = std::mem::take(&mut *state);
            *state = op(current);
        }
        self.bump();
    }

    fn report(&self, action: Action, err: BackendError) -> BackendError {
        let notice = lock(&self.notices).raise(action, &err, Instant::now());
        warn!("{notice}");
        self.bump();
        err
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
