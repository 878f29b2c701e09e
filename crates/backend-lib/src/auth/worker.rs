// ============================
// crates/backend-lib/src/auth/worker.rs
// ============================
//! Bounded offload of CPU-bound hashing work.
//!
//! Hash and verify calls run on tokio's blocking pool; a semaphore caps how
//! many run at once so a burst of logins queues here instead of starving
//! the blocking pool or the request-accepting tasks.
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::password::PasswordError;

#[derive(Debug, Clone)]
pub struct HashWorkers {
    permits: Arc<Semaphore>,
    size: usize,
}

impl HashWorkers {
    /// `size == 0` picks the available parallelism
    pub fn new(size: usize) -> Self {
        let size = if size == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            size
        };
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `job` on the blocking pool once a worker slot is free
    pub async fn run<F, T>(&self, job: F) -> Result<T, PasswordError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| PasswordError::Worker(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| PasswordError::Worker(e.to_string()))
    }
}
