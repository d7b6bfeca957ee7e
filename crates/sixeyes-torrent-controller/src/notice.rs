//! Transient, user-facing failure messages.

use std::{fmt, time::Duration};

use serde::Serialize;
use tokio::time::Instant;

/// How long a notice stays visible by default.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

/// The operation a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(missing_docs)]
pub enum Action {
    LoadTorrents,
    LoadCompleted,
    LoadSystemInfo,
    Add,
    Pause,
    Resume,
    Stop,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::LoadTorrents => "load torrents",
            Action::LoadCompleted => "load completed torrents",
            Action::LoadSystemInfo => "load system info",
            Action::Add => "add torrent",
            Action::Pause => "pause torrent",
            Action::Resume => "resume torrent",
            Action::Stop => "stop torrent",
            Action::Remove => "remove torrent",
        };
        f.write_str(text)
    }
}

/// A failure shown to the user until it expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// What was attempted.
    pub action: Action,
    /// `Failed to <action>: <reason>`.
    pub message: String,
    raised_at: Instant,
}

impl Notice {
    /// When the notice was raised.
    pub fn raised_at(&self) -> Instant {
        self.raised_at
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Notices raised at the command and poll boundary, oldest first.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl: Duration,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    #[allow(missing_docs)]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            notices: Vec::new(),
        }
    }

    /// Records a failure of `action` and returns the notice.
    pub fn raise(&mut self, action: Action, reason: impl fmt::Display, now: Instant) -> Notice {
        self.prune(now);
        let notice = Notice {
            action,
            message: format!("Failed to {action}: {reason}"),
            raised_at: now,
        };
        self.notices.push(notice.clone());
        notice
    }

    /// Notices that have not yet expired at `now`.
    pub fn active(&self, now: Instant) -> Vec<Notice> {
        self.notices
            .iter()
            .filter(|n| !self.is_expired(n, now))
            .cloned()
            .collect()
    }

    /// Drops expired notices and returns how many were dropped.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.notices.len();
        let ttl = self.ttl;
        self.notices
            .retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
        before - self.notices.len()
    }

    fn is_expired(&self, notice: &Notice, now: Instant) -> bool {
        now.saturating_duration_since(notice.raised_at) >= self.ttl
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_action() {
        let mut board = NoticeBoard::default();
        let notice = board.raise(Action::Pause, "network error: refused", Instant::now());
        assert_eq!(
            notice.message,
            "Failed to pause torrent: network error: refused"
        );
        assert_eq!(notice.action, Action::Pause);
    }

    #[test]
    fn notices_expire_after_ttl() {
        let start = Instant::now();
        let mut board = NoticeBoard::new(Duration::from_secs(5));
        board.raise(Action::Add, "boom", start);
        board.raise(Action::Remove, "boom", start + Duration::from_secs(3));

        assert_eq!(board.active(start + Duration::from_secs(4)).len(), 2);

        let later = board.active(start + Duration::from_secs(5));
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].action, Action::Remove);

        assert_eq!(board.prune(start + Duration::from_secs(8)), 2);
        assert_eq!(board.prune(start + Duration::from_secs(9)), 0);
        assert!(board.active(start + Duration::from_secs(8)).is_empty());
    }
}
