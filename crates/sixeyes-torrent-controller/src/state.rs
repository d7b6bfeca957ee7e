//! Local read model and the two pure operations that evolve it.
//!
//! [`apply_optimistic`] reflects a command the backend has accepted; [`merge`] folds in a
//! server response. Both take the state by value and return the next state, so they can be
//! exercised without any transport. The server always wins: the next successful poll
//! overwrites whatever an optimistic update wrote.

use std::collections::HashMap;

use serde::Serialize;

use sixeyes_torrent_types::{
    CALCULATING_ETA, CompletedEntry, SystemSnapshot, Torrent, TorrentId, TorrentStatus,
    ZERO_SPEED,
};

use crate::history::{DEFAULT_HISTORY_LEN, SpeedHistory};

/// Default number of locally promoted completions kept.
pub const DEFAULT_COMPLETED_LIMIT: usize = 20;

/// A command the backend has accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert the provisional record returned by the add endpoint.
    Add(Torrent),
    #[allow(missing_docs)]
    Pause(TorrentId),
    #[allow(missing_docs)]
    Resume(TorrentId),
    #[allow(missing_docs)]
    Stop(TorrentId),
    #[allow(missing_docs)]
    Remove(TorrentId),
}

/// A successful poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerUpdate {
    /// The full active torrent list.
    Torrents(Vec<Torrent>),
    /// The authoritative completed list.
    Completed(Vec<CompletedEntry>),
    /// A system snapshot, live or synthetic.
    System(SystemSnapshot),
}

/// Last-known view of the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    torrents: Vec<Torrent>,
    completed: Vec<CompletedEntry>,
    system: Option<SystemSnapshot>,
    history: SpeedHistory,
    #[serde(skip)]
    completed_limit: usize,
}

impl DashboardState {
    /// Empty state with the given bounds.
    pub fn new(completed_limit: usize, history_len: usize) -> Self {
        Self {
            torrents: Vec::new(),
            completed: Vec::new(),
            system: None,
            history: SpeedHistory::new(history_len),
            completed_limit,
        }
    }

    /// Active torrents in backend order.
    pub fn torrents(&self) -> &[Torrent] {
        &self.torrents
    }

    /// Looks up an active torrent.
    pub fn torrent(&self, id: &TorrentId) -> Option<&Torrent> {
        self.torrents.iter().find(|t| &t.id == id)
    }

    /// Finished downloads.
    pub fn completed(&self) -> &[CompletedEntry] {
        &self.completed
    }

    /// Latest system snapshot, if any was applied.
    pub fn system(&self) -> Option<&SystemSnapshot> {
        self.system.as_ref()
    }

    /// Network speed samples.
    pub fn history(&self) -> &SpeedHistory {
        &self.history
    }

    fn update(&mut self, id: &TorrentId, change: impl FnOnce(&mut Torrent)) {
        if let Some(torrent) = self.torrents.iter_mut().find(|t| &t.id == id) {
            change(torrent);
        }
    }

    fn upsert(&mut self, torrent: Torrent) {
        match self.torrents.iter_mut().find(|t| t.id == torrent.id) {
            Some(existing) => *existing = torrent,
            None => self.torrents.push(torrent),
        }
    }

    fn promote(&mut self, entry: CompletedEntry) {
        if self.completed.iter().any(|c| c.id == entry.id) {
            return;
        }
        self.completed.push(entry);
        let excess = self.completed.len().saturating_sub(self.completed_limit);
        self.completed.drain(..excess);
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETED_LIMIT, DEFAULT_HISTORY_LEN)
    }
}

/// Applies the local effect of an accepted command.
///
/// Commands naming an id that is not present leave the state unchanged.
pub fn apply_optimistic(mut state: DashboardState, command: Command) -> DashboardState {
    match command {
        Command::Add(torrent) => state.upsert(torrent),
        Command::Pause(id) => state.update(&id, |t| {
            t.status = TorrentStatus::Paused;
            idle(t);
        }),
        Command::Resume(id) => state.update(&id, |t| {
            if t.is_complete() {
                t.status = TorrentStatus::Seeding;
                t.eta = None;
            } else {
                t.status = TorrentStatus::Downloading;
                t.eta = Some(CALCULATING_ETA.to_string());
            }
        }),
        Command::Stop(id) => state.update(&id, |t| {
            t.status = TorrentStatus::Stopped;
            idle(t);
        }),
        Command::Remove(id) => state.torrents.retain(|t| t.id != id),
    }
    state
}

fn idle(torrent: &mut Torrent) {
    torrent.download_speed = ZERO_SPEED.to_string();
    torrent.upload_speed = ZERO_SPEED.to_string();
    torrent.eta = None;
}

/// Folds a server response into the state.
///
/// A torrent list replaces the active collection; torrents that crossed to 100% without
/// seeding are promoted into the completed list on the way.
pub fn merge(mut state: DashboardState, update: ServerUpdate) -> DashboardState {
    match update {
        ServerUpdate::Torrents(torrents) => {
            let finished: Vec<CompletedEntry> = newly_finished(&state.torrents, &torrents)
                .map(CompletedEntry::from)
                .collect();
            for entry in finished {
                state.promote(entry);
            }
            state.torrents = torrents;
        }
        ServerUpdate::Completed(entries) => state.completed = entries,
        ServerUpdate::System(snapshot) => {
            state.history.record(&snapshot);
            state.system = Some(snapshot);
        }
    }
    state
}

/// Torrents of `next` whose progress went from below 100 in `previous` to 100, and which are
/// not seeding.
fn newly_finished<'a>(
    previous: &[Torrent],
    next: &'a [Torrent],
) -> impl Iterator<Item = &'a Torrent> {
    let before: HashMap<&TorrentId, u8> = previous.iter().map(|t| (&t.id, t.progress)).collect();
    next.iter().filter(move |t| {
        t.is_complete()
            && t.status != TorrentStatus::Seeding
            && before.get(&t.id).is_some_and(|progress| *progress < 100)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_completed, make_snapshot, make_torrent};

    fn state_with(torrents: Vec<Torrent>) -> DashboardState {
        merge(DashboardState::default(), ServerUpdate::Torrents(torrents))
    }

    #[test]
    fn pause_zeroes_speeds_and_clears_eta() {
        let state = state_with(vec![make_torrent("1", TorrentStatus::Downloading, 45)]);
        let state = apply_optimistic(state, Command::Pause("1".into()));

        let torrent = state.torrent(&"1".into()).unwrap();
        assert_eq!(torrent.status, TorrentStatus::Paused);
        assert_eq!(torrent.download_speed, ZERO_SPEED);
        assert_eq!(torrent.upload_speed, ZERO_SPEED);
        assert_eq!(torrent.eta, None);
    }

    #[test]
    fn resume_incomplete_torrent_downloads() {
        let state = state_with(vec![make_torrent("1", TorrentStatus::Paused, 45)]);
        let state = apply_optimistic(state, Command::Resume("1".into()));

        let torrent = state.torrent(&"1".into()).unwrap();
        assert_eq!(torrent.status, TorrentStatus::Downloading);
        assert_eq!(torrent.eta.as_deref(), Some(CALCULATING_ETA));
    }

    #[test]
    fn resume_complete_torrent_seeds() {
        let mut paused = make_torrent("1", TorrentStatus::Paused, 100);
        paused.upload_speed = "5.8 MB/s".to_string();
        let state = state_with(vec![paused]);
        let state = apply_optimistic(state, Command::Resume("1".into()));

        let torrent = state.torrent(&"1".into()).unwrap();
        assert_eq!(torrent.status, TorrentStatus::Seeding);
        assert_eq!(torrent.eta, None);
        assert_eq!(torrent.upload_speed, "5.8 MB/s");
    }

    #[test]
    fn stop_zeroes_speeds_and_clears_eta() {
        let state = state_with(vec![make_torrent("1", TorrentStatus::Seeding, 100)]);
        let state = apply_optimistic(state, Command::Stop("1".into()));

        let torrent = state.torrent(&"1".into()).unwrap();
        assert_eq!(torrent.status, TorrentStatus::Stopped);
        assert_eq!(torrent.download_speed, ZERO_SPEED);
        assert_eq!(torrent.upload_speed, ZERO_SPEED);
        assert_eq!(torrent.eta, None);
    }

    #[test]
    fn commands_touch_only_their_target() {
        let other = make_torrent("2", TorrentStatus::Downloading, 10);
        let state = state_with(vec![
            make_torrent("1", TorrentStatus::Downloading, 45),
            other.clone(),
        ]);
        let state = apply_optimistic(state, Command::Stop("1".into()));

        assert_eq!(state.torrent(&"2".into()), Some(&other));
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let state = state_with(vec![make_torrent("1", TorrentStatus::Downloading, 45)]);
        for command in [
            Command::Pause("9".into()),
            Command::Resume("9".into()),
            Command::Stop("9".into()),
            Command::Remove("9".into()),
        ] {
            let next = apply_optimistic(state.clone(), command);
            assert_eq!(next, state);
        }
    }

    #[test]
    fn add_appends_then_replaces_same_id() {
        let state = state_with(vec![make_torrent("1", TorrentStatus::Downloading, 45)]);
        let state = apply_optimistic(
            state,
            Command::Add(make_torrent("2", TorrentStatus::Downloading, 0)),
        );
        assert_eq!(state.torrents().len(), 2);
        assert_eq!(state.torrents()[1].id, TorrentId::new("2"));

        let state = apply_optimistic(
            state,
            Command::Add(make_torrent("2", TorrentStatus::Downloading, 3)),
        );
        assert_eq!(state.torrents().len(), 2);
        assert_eq!(state.torrent(&"2".into()).unwrap().progress, 3);
    }

    #[test]
    fn remove_drops_the_record() {
        let state = state_with(vec![
            make_torrent("1", TorrentStatus::Downloading, 45),
            make_torrent("2", TorrentStatus::Seeding, 100),
        ]);
        let state = apply_optimistic(state, Command::Remove("1".into()));

        assert_eq!(state.torrents().len(), 1);
        assert!(state.torrent(&"1".into()).is_none());
    }

    #[test]
    fn merge_replaces_optimistic_changes() {
        let state = state_with(vec![make_torrent("1", TorrentStatus::Downloading, 45)]);
        let state = apply_optimistic(state, Command::Pause("1".into()));
        let server = make_torrent("1", TorrentStatus::Downloading, 50);
        let state = merge(state, ServerUpdate::Torrents(vec![server.clone()]));

        assert_eq!(state.torrents(), &[server]);
    }

    #[test]
    fn crossing_to_complete_promotes() {
        let state = state_with(vec![make_torrent("x", TorrentStatus::Downloading, 80)]);
        let state = merge(
            state,
            ServerUpdate::Torrents(vec![make_torrent("x", TorrentStatus::Downloading, 100)]),
        );

        assert_eq!(state.completed().len(), 1);
        assert_eq!(state.completed()[0].id, TorrentId::new("x"));
        assert_eq!(state.completed()[0].completed_at, "just now");
    }

    #[test]
    fn seeding_or_already_complete_is_not_promoted() {
        let state = state_with(vec![
            make_torrent("a", TorrentStatus::Downloading, 80),
            make_torrent("b", TorrentStatus::Downloading, 100),
        ]);
        let state = merge(
            state,
            ServerUpdate::Torrents(vec![
                make_torrent("a", TorrentStatus::Seeding, 100),
                make_torrent("b", TorrentStatus::Downloading, 100),
                make_torrent("c", TorrentStatus::Downloading, 100),
            ]),
        );

        assert!(state.completed().is_empty());
    }

    #[test]
    fn promotion_is_bounded_and_deduplicated() {
        let mut state = DashboardState::new(2, DEFAULT_HISTORY_LEN);
        for id in ["1", "2", "3"] {
            state = merge(
                state,
                ServerUpdate::Torrents(vec![make_torrent(id, TorrentStatus::Downloading, 99)]),
            );
            state = merge(
                state,
                ServerUpdate::Torrents(vec![make_torrent(id, TorrentStatus::Downloading, 100)]),
            );
        }
        let ids: Vec<&str> = state.completed().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);

        let state = merge(
            state,
            ServerUpdate::Torrents(vec![make_torrent("3", TorrentStatus::Downloading, 50)]),
        );
        let state = merge(
            state,
            ServerUpdate::Torrents(vec![make_torrent("3", TorrentStatus::Completed, 100)]),
        );
        assert_eq!(state.completed().len(), 2);
    }

    #[test]
    fn server_completed_list_wins() {
        let state = state_with(vec![make_torrent("x", TorrentStatus::Downloading, 80)]);
        let state = merge(
            state,
            ServerUpdate::Torrents(vec![make_torrent("x", TorrentStatus::Downloading, 100)]),
        );
        let authoritative = vec![make_completed("101"), make_completed("x")];
        let state = merge(state, ServerUpdate::Completed(authoritative.clone()));

        assert_eq!(state.completed(), authoritative.as_slice());
    }

    #[test]
    fn system_update_records_history() {
        let state = merge(
            DashboardState::default(),
            ServerUpdate::System(make_snapshot(12.0, 3.0)),
        );

        assert_eq!(state.system().map(|s| s.network.download_speed), Some(12.0));
        assert_eq!(state.history().len(), 1);
    }
}
