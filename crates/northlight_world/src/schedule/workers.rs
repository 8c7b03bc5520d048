//! # Worker Pool
//!
//! Data-parallel fan-out for one dispatch: a set of independent tasks is
//! distributed over scoped worker threads through a channel and joined
//! before the call returns. Tasks run to completion or not at all; there
//! is no suspension point and no mid-dispatch cancellation.
//!
//! Scoped threads are used instead of long-lived workers so tasks may
//! borrow world data for the duration of the dispatch.

use crossbeam_channel::unbounded;

/// A single unit of work for one dispatch.
pub type Task<'env> = Box<dyn FnOnce() + Send + 'env>;

/// Fixed-width worker pool for intra-tick parallelism.
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Creates a pool. Zero workers disables parallelism; all tasks then
    /// run inline on the calling thread.
    #[must_use]
    pub const fn new(workers: usize) -> Self {
        Self { workers }
    }

    /// Number of worker threads used per dispatch.
    #[inline]
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Runs all tasks and joins them before returning.
    ///
    /// Tasks must be mutually independent; the pool gives no ordering
    /// guarantee between them.
    pub fn run<'env>(&self, tasks: Vec<Task<'env>>) {
        if self.workers == 0 || tasks.len() <= 1 {
            for task in tasks {
                task();
            }
            return;
        }

        let thread_count = self.workers.min(tasks.len());
        let (sender, receiver) = unbounded::<Task<'env>>();
        for task in tasks {
            let _ = sender.send(task);
        }
        drop(sender);

        std::thread::scope(|scope| {
            for _ in 0..thread_count {
                let receiver = receiver.clone();
                scope.spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        task();
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_all_tasks_run_and_join() {
        let pool = WorkerPool::new(4);
        let counter = AtomicUsize::new(0);

        let tasks: Vec<Task<'_>> = (0..100)
            .map(|_| {
                Box::new(|| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }) as Task<'_>
            })
            .collect();
        pool.run(tasks);

        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_zero_workers_runs_inline() {
        let pool = WorkerPool::new(0);
        let counter = AtomicUsize::new(0);

        let tasks: Vec<Task<'_>> = (0..10)
            .map(|_| {
                Box::new(|| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }) as Task<'_>
            })
            .collect();
        pool.run(tasks);

        assert_eq!(counter.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn test_tasks_may_borrow_locals() {
        let pool = WorkerPool::new(2);
        let mut data = vec![0u32; 64];

        {
            let mut tasks: Vec<Task<'_>> = Vec::new();
            for chunk in data.chunks_mut(16) {
                tasks.push(Box::new(move || {
                    for value in chunk {
                        *value += 1;
                    }
                }));
            }
            pool.run(tasks);
        }

        assert!(data.iter().all(|v| *v == 1));
    }
}
