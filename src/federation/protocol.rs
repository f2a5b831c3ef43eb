//! Federation Wire Constants
//!
//! Peers talk to each other with the same public `GET /chirps` route that clients
//! use; the only federation-specific signal is the `Via` header.

/// Route aggregated on every peer.
pub const ENDPOINT_CHIRPS: &str = "/chirps";

/// Header carrying the visited-peer chain.
pub const VIA_HEADER: &str = "Via";

/// Username attributed to placeholder posts describing peer failures.
pub const SYSTEM_USERNAME: &str = "SYSTEM";
