//! Peer Client
//!
//! One outbound `GET /chirps` per call, on a fresh connection that is closed
//! afterwards. The [`PeerClient`] trait is the seam the fan-out depends on, so the
//! aggregation logic can be exercised without real peers.

use super::protocol::{ENDPOINT_CHIRPS, VIA_HEADER};
use super::types::{PeerDescriptor, ViaChain};
use crate::storage::types::ChirpList;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONNECTION};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default bound on one peer round trip.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum PeerError {
    /// Could not connect, or the connection failed or timed out mid-request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer answered with a non-2xx status.
    #[error("Peer answered with status {0}")]
    Status(u16),

    /// The peer answered 2xx but the body was not a chirp list.
    #[error("Unreadable response body: {0}")]
    InvalidBody(String),
}

#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the peer's aggregated chirps, sending `via` as the `Via` header.
    /// Entries are returned exactly as the peer sent them.
    async fn fetch_chirps(&self, peer: &PeerDescriptor, via: &ViaChain)
    -> Result<Vec<Value>, PeerError>;
}

/// `reqwest`-backed peer client.
pub struct HttpPeerClient {
    http_client: reqwest::Client,
}

impl HttpPeerClient {
    /// Builds a client that never reuses connections and gives each peer at
    /// most `timeout` for the whole round trip.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(0)
            .http1_title_case_headers()
            .no_proxy()
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chirps(
        &self,
        peer: &PeerDescriptor,
        via: &ViaChain,
    ) -> Result<Vec<Value>, PeerError> {
        let url = format!("http://{}{}", peer.identity(), ENDPOINT_CHIRPS);
        tracing::debug!("Fetching {} with Via: {}", url, via.header_value());

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(VIA_HEADER, via.header_value())
            .header(CONNECTION, "close")
            .send()
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }

        let list: ChirpList<Value> = response
            .json()
            .await
            .map_err(|e| PeerError::InvalidBody(e.to_string()))?;

        Ok(list.chirps)
    }
}
