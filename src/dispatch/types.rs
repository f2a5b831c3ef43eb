use async_trait::async_trait;

/// Something a worker hands each dequeued item to.
///
/// Implementations own the item and are responsible for finishing it
/// (for requests: writing the response and closing the connection).
#[async_trait]
pub trait Dispatch<T>: Send + Sync + 'static {
    async fn dispatch(&self, item: T);
}
