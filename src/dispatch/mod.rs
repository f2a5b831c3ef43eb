//! Request Dispatch Module
//!
//! Decouples the accept loop from request processing.
//!
//! ## Architecture Overview
//! The dispatcher follows a **Push/Take** model over a single unbounded queue:
//! 1. **Submission**: The accept loop pushes every parsed request through a cloneable
//!    [`queue::QueueSender`]. Pushing never blocks and never drops a request.
//! 2. **Taking**: A fixed number of workers share the receiving end and each blocks
//!    until a request is available.
//! 3. **Isolation**: Every request is handled in its own task that the worker awaits, so
//!    a panic while handling one request is logged and the worker goes back to waiting.
//!
//! With more than one worker, requests may complete out of arrival order.
//!
//! ## Submodules
//! - **`queue`**: The hand-off channel.
//! - **`executor`**: The worker pool and its lifecycle.
//! - **`types`**: The [`types::Dispatch`] seam implemented by the router.

pub mod executor;
pub mod queue;
pub mod types;
