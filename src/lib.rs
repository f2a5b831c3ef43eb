//! Chirp Server Library
//!
//! This library crate holds the subsystems of a small chirp (short post) server.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The request path is: accept loop -> parse -> enqueue -> worker -> router -> response.
//!
//! - **`config`**: Properties-file and command-line configuration, including the
//!   static list of federation peers.
//! - **`http`**: The textual wire layer. Reads one request frame off a connection
//!   and writes minimal `HTTP/1.1` responses back.
//! - **`dispatch`**: The hand-off between the accept loop and a fixed pool of workers.
//! - **`router`**: Maps `(method, path)` to a handler and owns response writing.
//! - **`federation`**: Fans `GET /chirps` out to peer servers, guarding against
//!   request cycles with a propagated `Via` chain.
//! - **`storage`**: The in-memory post store behind a single lock.
//! - **`server`**: Binds the listener and wires everything together.

pub mod config;
pub mod dispatch;
pub mod federation;
pub mod http;
pub mod router;
pub mod server;
pub mod storage;
