use crate::dispatch::queue::QueueSender;
use crate::http::request::Request;
use crate::http::response::Response;

use http::StatusCode;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Limits applied while reading a request off a fresh connection.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub timeout: Duration,
    pub max_body: usize,
}

/// Reads one request from `stream` and pushes it onto the dispatch queue.
///
/// Connections that close without a request line are dropped silently. A frame
/// that cannot be parsed gets a best-effort 400; a read that outlasts
/// `limits.timeout` is abandoned and the connection closed.
pub async fn enqueue_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    queue: QueueSender<Request>,
    limits: ReadLimits,
) {
    let read = Request::read(stream, peer_addr, limits.max_body);

    match tokio::time::timeout(limits.timeout, read).await {
        Ok(Ok(Some(request))) => {
            tracing::debug!(
                "Queued {} {} from {}",
                request.frame.method,
                request.frame.target,
                peer_addr
            );
            if queue.push(request).is_err() {
                tracing::error!("Dispatch queue closed, dropping request from {}", peer_addr);
            }
        }
        Ok(Ok(None)) => tracing::debug!("Empty request from {}, skipping", peer_addr),
        Ok(Err((mut stream, e))) => {
            tracing::warn!("Bad request from {}: {}", peer_addr, e);
            if let Err(e) = Response::error(StatusCode::BAD_REQUEST)
                .write_to(&mut stream)
                .await
            {
                tracing::debug!("Could not send 400 to {}: {}", peer_addr, e);
            }
        }
        Err(_) => tracing::warn!(
            "Timed out after {:?} reading request from {}",
            limits.timeout,
            peer_addr
        ),
    }
}
