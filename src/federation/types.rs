use super::protocol::SYSTEM_USERNAME;
use crate::storage::types::Chirp;

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PeerParseError {
    #[error("Peer {0:?} is not in host:port form")]
    MissingPort(String),

    #[error("Peer {0:?} has an empty host")]
    EmptyHost(String),

    #[error("Peer {0:?} has an invalid port")]
    InvalidPort(String),
}

/// A federation peer, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerDescriptor {
    pub host: String,
    pub port: u16,
}

impl PeerDescriptor {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// `host:port`, the form used in Via chains and the contact guard.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses a comma-separated peer list, ignoring blanks and stray quotes.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, PeerParseError> {
        raw.replace('"', "")
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for PeerDescriptor {
    type Err = PeerParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| PeerParseError::MissingPort(raw.to_string()))?;
        if host.trim().is_empty() {
            return Err(PeerParseError::EmptyHost(raw.to_string()));
        }
        let port = port
            .trim()
            .parse()
            .map_err(|_| PeerParseError::InvalidPort(raw.to_string()))?;

        Ok(Self::new(host.trim(), port))
    }
}

impl fmt::Display for PeerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The visited-peer chain carried in the `Via` header.
///
/// Scoped to one request chain; never process state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViaChain {
    hops: Vec<String>,
}

impl ViaChain {
    /// Parses a header value. Entries are trimmed and blanks dropped, so
    /// `"a:1, b:2"` and `"a:1,b:2"` are the same chain.
    pub fn parse(header: &str) -> Self {
        Self {
            hops: header
                .split(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.hops.iter().any(|hop| hop == identity)
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn hops(&self) -> &[String] {
        &self.hops
    }

    /// The chain to send onward: this chain with `local_identity` appended.
    pub fn forwarded(&self, local_identity: &str) -> Self {
        let mut hops = self.hops.clone();
        hops.push(local_identity.to_string());
        Self { hops }
    }

    /// Header value form: comma-joined identities.
    pub fn header_value(&self) -> String {
        self.hops.join(",")
    }
}

/// A synthetic post describing a peer failure.
pub fn placeholder_post(message: &str) -> Value {
    json!({
        "username": SYSTEM_USERNAME,
        "content": message,
    })
}

/// One entry of an aggregated listing.
///
/// Local chirps are typed; peer entries (including placeholders) are carried
/// verbatim. Both serialise transparently, so the list renders as plain posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedEntry {
    Local(Chirp),
    Remote(Value),
}
