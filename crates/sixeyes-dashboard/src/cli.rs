use std::time::Duration;

use clap::{Parser, Subcommand};

use sixeyes_dashboard::{DEFAULT_BASE_URL, DashboardConfig, Request};
use sixeyes_torrent_types::TorrentId;

/// Top-level CLI struct for the binary.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Base URL of the torrent backend.
    #[arg(long, global = true, env = "SIXEYES_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Seconds between two polls.
    #[arg(
        long,
        global = true,
        env = "SIXEYES_POLL_INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Locally promoted completions kept.
    #[arg(long, global = true, env = "SIXEYES_COMPLETED_LIMIT", default_value_t = 20)]
    pub completed_limit: usize,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Dashboard commands. `watch` runs when none is given.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum CliCommand {
    /// Poll the backend and log a summary on every change until interrupted.
    Watch,
    /// Print the active torrents.
    List,
    /// Print the completed downloads.
    Completed,
    /// Print storage and network metrics.
    System,
    /// Add a magnet link or torrent URL.
    Add {
        /// Magnet link or torrent URL.
        magnet: String,
    },
    /// Pause a torrent.
    Pause {
        /// Torrent id.
        id: String,
    },
    /// Resume a torrent.
    Resume {
        /// Torrent id.
        id: String,
    },
    /// Stop a torrent.
    Stop {
        /// Torrent id.
        id: String,
    },
    /// Remove a torrent.
    Remove {
        /// Torrent id.
        id: String,
    },
}

impl Cli {
    pub(crate) fn config(&self) -> DashboardConfig {
        DashboardConfig {
            base_url: self.base_url.clone(),
            poll_interval: Duration::from_secs(self.poll_interval),
            completed_limit: self.completed_limit,
        }
    }

    pub(crate) fn request(&self) -> Request {
        self.command
            .clone()
            .map(Request::from)
            .unwrap_or(Request::Watch)
    }
}

impl From<CliCommand> for Request {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Watch => Request::Watch,
            CliCommand::List => Request::List,
            CliCommand::Completed => Request::Completed,
            CliCommand::System => Request::System,
            CliCommand::Add { magnet } => Request::Add(magnet),
            CliCommand::Pause { id } => Request::Pause(TorrentId::new(id)),
            CliCommand::Resume { id } => Request::Resume(TorrentId::new(id)),
            CliCommand::Stop { id } => Request::Stop(TorrentId::new(id)),
            CliCommand::Remove { id } => Request::Remove(TorrentId::new(id)),
        }
    }
}
