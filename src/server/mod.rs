//! Chirp Server
//!
//! Binds the listener and wires the subsystems together:
//!
//! 1. **Store**: seeded once from `<documentRoot>/chirps.json` if present.
//! 2. **Federation**: peer list plus a `reqwest` client, identified as `hostname:port`
//!    using the port actually bound.
//! 3. **Router**: the [`Dispatch`](crate::dispatch::types::Dispatch) target for workers.
//! 4. **Accept loop**: one task per connection reads the request frame, then the
//!    request is queued for the worker pool.

pub mod listener;

use crate::config::ServerConfig;
use crate::dispatch::executor::WorkerPool;
use crate::dispatch::queue::DispatchQueue;
use crate::federation::client::HttpPeerClient;
use crate::federation::fanout::Federation;
use crate::http::request::Request;
use crate::router::Router;
use crate::storage::memory::ChirpStore;
use listener::{ReadLimits, enqueue_connection};

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Pause after a failed `accept()` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub struct ChirpServer {
    listener: TcpListener,
    config: ServerConfig,
    router: Arc<Router>,
    local_identity: String,
}

impl ChirpServer {
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = SocketAddr::new(config.bind_address, config.port);
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        Self::from_listener(listener, config)
    }

    /// Builds a server around an already bound listener. `config.port` is
    /// ignored in favour of the listener's port.
    pub fn from_listener(listener: TcpListener, config: ServerConfig) -> anyhow::Result<Self> {
        let port = listener.local_addr()?.port();
        let local_identity = config.identity(port);

        let store = Arc::new(ChirpStore::new());
        store.seed_from(&config.seed_file());

        let client = Arc::new(HttpPeerClient::new(config.peer_timeout)?);
        let federation = Arc::new(Federation::new(
            config.peers.clone(),
            local_identity.clone(),
            client,
        ));
        let router = Arc::new(Router::new(
            store,
            federation,
            config.document_root.clone(),
        ));

        Ok(Self {
            listener,
            config,
            router,
            local_identity,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn local_identity(&self) -> &str {
        &self.local_identity
    }

    pub fn store(&self) -> Arc<ChirpStore> {
        self.router.store().clone()
    }

    /// Starts the workers and serves connections until the process exits.
    pub async fn run(self) -> anyhow::Result<()> {
        let (sender, queue) = DispatchQueue::<Request>::channel();
        let pool = WorkerPool::new(Arc::new(queue), self.router.clone(), self.config.worker_count);
        pool.start();

        let limits = ReadLimits {
            timeout: self.config.read_timeout,
            max_body: self.config.max_body_bytes,
        };

        tracing::info!(
            "Chirp server listening on {} as {} (document root {})",
            self.listener.local_addr()?,
            self.local_identity,
            self.config.document_root.display()
        );

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            tracing::trace!("Accepted connection from {}", peer_addr);
            tokio::spawn(enqueue_connection(stream, peer_addr, sender.clone(), limits));
        }
    }
}

#[cfg(test)]
mod tests;
