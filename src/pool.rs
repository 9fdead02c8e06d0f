//! Bounded worker pool shared by every stage of a run

use crate::error::{EraseError, Result};
use rayon::prelude::*;

/// Fixed-size pool of worker threads
///
/// Every `map*` call is a stage barrier: it fans out one task per item and
/// returns only when all of them have finished, with results in input order.
/// Threads are joined when the pool is dropped.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool with exactly `workers` threads
    ///
    /// # Errors
    /// - `InvalidConfig` if `workers` is zero
    /// - `Processing` if the operating system refuses to spawn the threads
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(EraseError::invalid_config("Worker pool needs at least one thread"));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("whitebg-worker-{index}"))
            .build()
            .map_err(|e| {
                EraseError::processing_stage_error("worker pool", &e.to_string(), None)
            })?;

        log::debug!("Started worker pool with {} threads", workers);
        Ok(Self { pool, workers })
    }

    /// Number of worker threads
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item by reference
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }

    /// Apply `f` to every item by value
    pub fn map_owned<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}
