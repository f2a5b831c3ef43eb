//! Worker Pool Implementation
//!
//! Spawns a fixed number of long-lived workers that drain the [`DispatchQueue`].
//!
//! ## Responsibilities
//! - **Taking**: each worker blocks on the queue until an item is available.
//! - **Isolation**: the item is handled in a child task; a panic there is caught at
//!   the `JoinHandle` and logged, and the worker keeps serving.
//! - **Accounting**: a shared counter of finished items, used for logging and tests.

use super::queue::DispatchQueue;
use super::types::Dispatch;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;

/// Default pool size when the configuration does not say otherwise.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// The engine that drives request processing.
pub struct WorkerPool<T> {
    /// Shared receiving end of the dispatch queue.
    queue: Arc<DispatchQueue<T>>,
    /// Where each dequeued item is sent.
    handler: Arc<dyn Dispatch<T>>,
    /// Number of concurrent workers. Fixed for the life of the pool.
    worker_count: usize,
    /// Items finished, whether or not their handler panicked.
    processed: AtomicU64,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Creates a new pool. A `worker_count` of zero is raised to one.
    pub fn new(
        queue: Arc<DispatchQueue<T>>,
        handler: Arc<dyn Dispatch<T>>,
        worker_count: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            handler,
            worker_count: worker_count.max(1),
            processed: AtomicU64::new(0),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Spawns the workers and returns immediately.
    /// Each worker runs until the queue is closed and drained.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        tracing::info!("Starting {} request workers", self.worker_count);

        (0..self.worker_count)
            .map(|worker_id| {
                let pool = self.clone();
                tokio::spawn(async move {
                    pool.worker_loop(worker_id).await;
                })
            })
            .collect()
    }

    /// The main loop for a single worker.
    async fn worker_loop(&self, worker_id: usize) {
        tracing::debug!("Worker {} started", worker_id);

        while let Some(item) = self.queue.take().await {
            let handler = self.handler.clone();
            let outcome = tokio::spawn(async move { handler.dispatch(item).await }).await;

            match outcome {
                Ok(()) => tracing::trace!("Worker {} finished a request", worker_id),
                Err(e) if e.is_panic() => {
                    tracing::error!("Worker {} recovered from a panicking request: {}", worker_id, e)
                }
                Err(e) => tracing::warn!("Worker {} request task was interrupted: {}", worker_id, e),
            }

            self.processed.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!("Worker {} stopping: dispatch queue closed", worker_id);
    }
}
