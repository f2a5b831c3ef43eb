//! Federation Fan-Out Module
//!
//! Aggregates `GET /chirps` across a static set of peer servers.
//!
//! ## Loop Prevention
//! Every server in the federation graph may fan out again, so a naive design would
//! bounce requests around a cycle forever (A -> B -> A -> ...). Two mechanisms apply:
//! - **Via chain**: the comma-joined list of identities (`host:port`) already visited
//!   is forwarded on every outbound request with the local identity appended. A peer
//!   named in the incoming chain is never dialled. This is the only signal that
//!   travels between hops, so cycle prevention relies on every peer forwarding it.
//! - **Contact guard**: a set local to one aggregation call that stops the same peer
//!   being dialled twice within that call. It is not shared between requests and is
//!   discarded when the call returns.
//!
//! Peer failures never fail the aggregation: each unreachable or failing peer is
//! reported inline as one placeholder post from the `SYSTEM` user.
//!
//! ## Submodules
//! - **`types`**: peer descriptors, the Via chain, placeholder posts.
//! - **`protocol`**: outbound request constants.
//! - **`client`**: the [`client::PeerClient`] seam and its `reqwest` implementation.
//! - **`fanout`**: the aggregation pass itself.

pub mod client;
pub mod fanout;
pub mod protocol;
pub mod types;
