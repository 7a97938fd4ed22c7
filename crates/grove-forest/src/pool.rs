//! Bounded-concurrency job runner.

use std::num::NonZeroUsize;

use rayon::ThreadPool;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::error::ForestError;

/// Runs independent jobs with at most `n_workers` running at once.
///
/// Worker count semantics:
/// - `0` = one worker per available hardware thread
/// - `1` = sequential, in the calling thread (no pool is created)
/// - `n > 1` = a dedicated pool of exactly `n` threads
#[derive(Debug)]
pub struct WorkerPool {
    n_workers: usize,
    pool: Option<ThreadPool>,
}

impl WorkerPool {
    /// Create a pool with the given worker count.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::WorkerPool`] if the OS refuses to spawn threads.
    pub fn new(n_workers: usize) -> Result<Self, ForestError> {
        let n_workers = if n_workers == 0 {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            n_workers
        };
        let pool = if n_workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_workers)
                .thread_name(|i| format!("grove-worker-{i}"))
                .build()
                .map_err(|source| ForestError::WorkerPool { n_workers, source })?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { n_workers, pool })
    }

    /// Return the resolved worker count.
    #[must_use]
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Run `job(i)` for every `i` in `0..n_jobs` and return the results in
    /// index order.
    ///
    /// One result slot per job is reserved up front and each job writes only
    /// its own slot. The call returns once every job has finished.
    pub fn run<T, F>(&self, n_jobs: usize, job: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(n_jobs).collect();
        match &self.pool {
            Some(pool) => pool.install(|| {
                slots
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, slot)| *slot = Some(job(i)));
            }),
            None => {
                for (i, slot) in slots.iter_mut().enumerate() {
                    *slot = Some(job(i));
                }
            }
        }
        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_resolves_to_hardware_parallelism() {
        let pool = WorkerPool::new(0).unwrap();
        assert!(pool.n_workers() >= 1);
    }

    #[test]
    fn sequential_runs_in_order() {
        let pool = WorkerPool::new(1).unwrap();
        assert_eq!(pool.run(5, |i| i * 10), vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn parallel_results_keep_slot_order() {
        let pool = WorkerPool::new(4).unwrap();
        let out = pool.run(64, |i| {
            // Later slots finish first.
            std::thread::sleep(Duration::from_micros(((64 - i) * 20) as u64));
            i
        });
        assert_eq!(out, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn never_exceeds_worker_count() {
        let pool = WorkerPool::new(3).unwrap();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        pool.run(24, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            active.fetch_sub(1, Ordering::SeqCst);
        });
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn zero_jobs_is_empty() {
        let pool = WorkerPool::new(2).unwrap();
        let out: Vec<usize> = pool.run(0, |i| i);
        assert!(out.is_empty());
    }
}
