//! # Torrent controller for the Sixeyes REST backend.
//!
//! [`RestClient`] implements [`TorrentBackend`](sixeyes_torrent_types::TorrentBackend) over
//! HTTP. [`Synchronizer`] keeps a local read model of any backend in sync by polling, and
//! applies commands optimistically once the backend accepts them.
//!
//! usage:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use sixeyes_torrent_controller::{RestClient, SyncConfig, Synchronizer};
//! use sixeyes_torrent_types::TorrentId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RestClient::try_new("http://localhost:9090")?;
//!     let sync = Arc::new(Synchronizer::new(client, SyncConfig::default()));
//!     let poller = sync.start();
//!
//!     sync.add_torrent("magnet:?xt=urn:btih:...&dn=debian.iso").await?;
//!     sync.pause_torrent(&TorrentId::new("1")).await?;
//!     println!("{}", sync.summary());
//!
//!     poller.stop().await;
//!     Ok(())
//! }
//! ```
//!

mod client;
mod conversions;
pub mod fallback;
pub mod history;
pub mod notice;
pub mod state;
pub mod summary;
mod sync;

#[cfg(test)]
mod testutil;

#[cfg(test)]
use test_log as _;
#[cfg(test)]
use tracing_subscriber as _;

pub use client::RestClient;
pub use history::{SpeedHistory, SpeedSample};
pub use notice::{Action, Notice, NoticeBoard};
pub use state::{Command, DashboardState, ServerUpdate, apply_optimistic, merge};
pub use summary::DashboardSummary;
pub use sync::{DEFAULT_POLL_INTERVAL, PollerHandle, SyncConfig, Synchronizer};
