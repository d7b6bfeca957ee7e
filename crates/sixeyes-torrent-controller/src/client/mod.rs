//! REST client for the Sixeyes torrent backend.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use url::Url;

use sixeyes_torrent_types::{
    BackendError, CompletedEntry, SystemSnapshot, Torrent, TorrentBackend, TorrentId,
};

use crate::conversions::{WireCompleted, WireSystemInfo, WireTorrent, decode_added};


/// Longest response body carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// RestClient talks to the backend's `/public/torrents` endpoints.
///
/// Every call issues exactly one HTTP request. Timeouts are left to the transport defaults.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    magnet: &'a str,
}

impl RestClient {
    /// Create a new RestClient for the backend at `base_url`.
    ///
    /// The base URL may carry a path prefix (`http://host/api/`); endpoint paths are appended
    /// to it.
    pub fn try_new(base_url: &str) -> Result<Self, BackendError> {
        let http = Client::builder()
            .build()
            .map_err(|e| BackendError::Network(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(http, base_url)
    }

    /// Create a RestClient around an existing `reqwest` client.
    pub fn with_http_client(http: Client, base_url: &str) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(format!(
                "{base_url}: cannot be used as a base URL"
            )));
        }

        debug!("Using torrent backend at {}", base_url);
        Ok(Self { http, base_url })
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/public/torrents/<segments...>`, encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| BackendError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty()
                .extend(["public", "torrents"])
                .extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, BackendError> {
        debug!("GET {url}");
        let response = self.send(self.http.get(url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TorrentBackend for RestClient {
    async fn add(&self, magnet: &str) -> Result<Torrent, BackendError> {
        debug!("Adding torrent from {magnet}");
        let url = self.endpoint(&["add"])?;
        let response = self
            .send(self.http.post(url).json(&AddRequest { magnet }))
            .await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let torrent = decode_added(body, magnet)?;
        debug!("Added {torrent:?}");
        Ok(torrent)
    }

    async fn list(&self) -> Result<Vec<Torrent>, BackendError> {
        debug!("Listing active torrents");
        let records: Vec<WireTorrent> = self.get_json(self.endpoint(&["get"])?).await?;
        let torrents = records
            .into_iter()
            .map(Torrent::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Active torrents: {}", torrents.len());

        Ok(torrents)
    }

    async fn completed(&self) -> Result<Vec<CompletedEntry>, BackendError> {
        debug!("Listing completed torrents");
        let records: Vec<WireCompleted> =
            self.get_json(self.endpoint(&["getCompleted"])?).await?;
        records.into_iter().map(CompletedEntry::try_from).collect()
    }

    async fn pause(&self, id: &TorrentId) -> Result<(), BackendError> {
        debug!("Pausing torrent {id}");
        let url = self.endpoint(&[id.as_str(), "pause"])?;
        self.send(self.http.put(url)).await?;
        debug!("Pause command sent");
        Ok(())
    }

    async fn resume(&self, id: &TorrentId) -> Result<(), BackendError> {
        debug!("Resuming torrent {id}");
        let url = self.endpoint(&[id.as_str(), "resume"])?;
        self.send(self.http.put(url)).await?;
        debug!("Resume command sent");
        Ok(())
    }

    async fn stop(&self, id: &TorrentId) -> Result<(), BackendError> {
        debug!("Stopping torrent {id}");
        let url = self.endpoint(&[id.as_str(), "stop"])?;
        self.send(self.http.put(url)).await?;
        debug!("Stop command sent");
        Ok(())
    }

    async fn remove(&self, id: &TorrentId) -> Result<(), BackendError> {
        debug!("Removing torrent {id}");
        let url = self.endpoint(&[id.as_str(), "removeTorrent"])?;
        self.send(self.http.delete(url)).await?;
        debug!("Remove command sent");
        Ok(())
    }

    async fn system_info(&self) -> Result<SystemSnapshot, BackendError> {
        debug!("Getting system info");
        let info: WireSystemInfo = self
            .get_json(self.endpoint(&["systemInfo", "getSystemStorage"])?)
            .await?;
        let snapshot = info.into_snapshot(Utc::now());
        debug!("System info: {snapshot:?}");

        Ok(snapshot)
    }
}

/// Maps reqwest failures that happen before a status is available.
fn map_transport_error(err: reqwest::Error) -> BackendError {
    if err.is_decode() {
        BackendError::Decode(err.to_string())
    } else {
        BackendError::Network(err.to_string())
    }
}

/// Builds the error for a non-2xx response, preferring the `message` or `error` field of a
/// JSON error body.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error"].iter().find_map(|key| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
    });

    let message = from_json.unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY).collect());
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        message
    };

    BackendError::Status {
        status: status.as_u16(),
        message,
    }
}
