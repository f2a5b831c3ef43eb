//! Textual HTTP Wire Layer
//!
//! Just enough HTTP/1.x to serve one request per connection: a request line, a header
//! block terminated by a blank line, and an optional `Content-Length` body. Responses
//! are a status line, a couple of headers and a body, after which the connection closes.
//!
//! No chunked encoding, keep-alive or pipelining.
//!
//! ## Submodules
//! - **`request`**: Frame parser and the owned [`request::Request`] handed to workers.
//! - **`response`**: Response builder and writer.

pub mod request;
pub mod response;
