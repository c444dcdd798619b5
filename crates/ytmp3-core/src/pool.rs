use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Jobs allowed to run at the same time.
    pub workers: usize,
    /// Jobs allowed to wait for a free worker before submissions are refused.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

/// Process-wide bounded pool for blocking pipeline jobs.
///
/// A job holds one of `workers` permits while it runs on tokio's blocking
/// thread pool.  Waiters are served FIFO by the semaphore; once
/// `queue_capacity` jobs are waiting, [`WorkerPool::submit`] fails fast with
/// [`Error::Busy`].
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    config: PoolConfig,
}

/// Decrements the wait counter when a queued submission stops waiting.
struct QueueSlot(Arc<AtomicUsize>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let workers = config.workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            waiting: Arc::new(AtomicUsize::new(0)),
            config: PoolConfig { workers, ..config },
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Jobs currently waiting for a worker.
    pub fn queued(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    /// Run `job` on a worker thread and wait for its result.
    pub async fn submit<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                let queued = self.waiting.fetch_add(1, Ordering::AcqRel);
                let slot = QueueSlot(Arc::clone(&self.waiting));
                if queued >= self.config.queue_capacity {
                    return Err(Error::Busy { queued });
                }
                debug!(queued = queued + 1, "waiting for a free worker");
                let permit = Arc::clone(&self.permits)
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Worker(e.to_string()))?;
                drop(slot);
                permit
            }
        };

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| Error::Worker(e.to_string()))?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
