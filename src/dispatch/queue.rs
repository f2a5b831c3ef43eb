//! Dispatch Queue
//!
//! An unbounded multi-producer, multi-consumer hand-off. Tokio's mpsc receiver is
//! single-consumer, so workers share it behind an async mutex; only the worker
//! currently waiting holds the lock, and it releases it as soon as an item arrives.

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

#[derive(Error, Debug)]
#[error("Dispatch queue is closed")]
pub struct QueueClosed;

/// Producer side, held by the accept loop. Cheap to clone.
#[derive(Debug)]
pub struct QueueSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueues an item. Only fails once every worker-side handle is gone.
    pub fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).map_err(|_| QueueClosed)
    }
}

/// Consumer side, shared by all workers.
pub struct DispatchQueue<T> {
    rx: Mutex<mpsc::UnboundedReceiver<T>>,
}

impl<T> DispatchQueue<T> {
    /// Creates a connected sender/queue pair.
    pub fn channel() -> (QueueSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (QueueSender { tx }, Self { rx: Mutex::new(rx) })
    }

    /// Waits for the next item. `None` once every sender is dropped and the
    /// queue has been drained.
    pub async fn take(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}
