//! Aggregation Pass
//!
//! Builds the `GET /chirps` listing: local chirps first, then each eligible peer's
//! entries in configuration order. Peers are contacted one after another inside the
//! worker serving the request, so a slow peer delays the whole response up to the
//! client timeout.

use super::client::{PeerClient, PeerError};
use super::types::{FeedEntry, PeerDescriptor, ViaChain, placeholder_post};
use crate::storage::types::Chirp;

use std::collections::HashSet;
use std::sync::Arc;

pub struct Federation {
    peers: Vec<PeerDescriptor>,
    /// This server's `host:port`, appended to forwarded Via chains.
    local_identity: String,
    client: Arc<dyn PeerClient>,
}

impl Federation {
    pub fn new(
        peers: Vec<PeerDescriptor>,
        local_identity: String,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        tracing::info!(
            "Federating as {} with {} peer(s): {:?}",
            local_identity,
            peers.len(),
            peers.iter().map(PeerDescriptor::identity).collect::<Vec<_>>()
        );

        Self {
            peers,
            local_identity,
            client,
        }
    }

    /// Merges `local` with the chirps of every peer that is neither in
    /// `incoming` nor already contacted during this call.
    ///
    /// Peer entries are appended without validation or de-duplication. A peer
    /// failure adds one placeholder post and never fails the call.
    pub async fn aggregate(&self, incoming: &ViaChain, local: Vec<Chirp>) -> Vec<FeedEntry> {
        let mut entries: Vec<FeedEntry> = local.into_iter().map(FeedEntry::Local).collect();

        // Contact guard for this pass only. Seeded with our own identity so a
        // peer list that names this server never makes it call itself.
        let mut contacted: HashSet<String> = HashSet::new();
        contacted.insert(self.local_identity.clone());

        let forwarded = incoming.forwarded(&self.local_identity);

        for peer in &self.peers {
            let identity = peer.identity();

            if incoming.contains(&identity) {
                tracing::debug!("Skipping {}: already in Via chain", identity);
                continue;
            }
            // Marked before any I/O, so a failed peer is not retried in this pass.
            if !contacted.insert(identity.clone()) {
                tracing::debug!("Skipping {}: already contacted in this pass", identity);
                continue;
            }

            match self.client.fetch_chirps(peer, &forwarded).await {
                Ok(chirps) => {
                    tracing::info!("Fetched {} chirps from {}", chirps.len(), identity);
                    entries.extend(chirps.into_iter().map(FeedEntry::Remote));
                }
                Err(PeerError::Transport(e)) => {
                    tracing::warn!("Failed to connect to {}: {}", identity, e);
                    entries.push(FeedEntry::Remote(placeholder_post(&format!(
                        "Failed to connect to server: {}",
                        identity
                    ))));
                }
                Err(e) => {
                    tracing::warn!("Error fetching chirps from {}: {}", identity, e);
                    entries.push(FeedEntry::Remote(placeholder_post(&format!(
                        "Error fetching chirps from {}",
                        identity
                    ))));
                }
            }
        }

        entries
    }
}
