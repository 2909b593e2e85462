//! Bounded work queue and fixed worker pool. A single mutex guards a
//! `VecDeque` of jobs; `num_threads` workers pop until the queue drains,
//! each folding its share into a private accumulator that is only combined
//! with the others after every worker has joined. This deliberately does
//! not reach for `rayon`'s work-stealing scheduler: a static pool of OS
//! threads draining one shared mutex, generalised to a job queue instead of
//! a fixed tile grid.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A bounded queue of jobs of type `T`, consumed by a fixed pool of
/// workers. "Bounded" here means the queue is seeded once with its full
/// job list up front; workers never push new jobs.
pub struct WorkQueue<T> {
    inner: Mutex<VecDeque<T>>,
    total: usize,
    remaining: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(jobs: Vec<T>) -> Self {
        let total = jobs.len();
        Self {
            inner: Mutex::new(VecDeque::from(jobs)),
            total,
            remaining: AtomicUsize::new(total),
        }
    }

    /// Pop the next job, or `None` once the queue is drained. The only
    /// suspension point in a worker's inner loop.
    pub fn pop(&self) -> Option<T> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let job = guard.pop_front();
        drop(guard);
        if job.is_some() {
            self.remaining.fetch_sub(1, Ordering::Relaxed);
        }
        job
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    /// `1 - remaining/total`.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        1.0 - self.remaining() as f32 / self.total as f32
    }
}

/// Spawn `num_threads` workers, each running `make_worker` to completion
/// and returning its own per-thread accumulator. Blocks until every
/// worker has joined, then hands back the per-thread results for the
/// caller to fold.
pub fn run_workers<T, R, F>(queue: &WorkQueue<T>, num_threads: usize, make_worker: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(&WorkQueue<T>) -> R + Sync,
{
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..num_threads.max(1))
            .map(|_| scope.spawn(|| make_worker(queue)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread panicked"))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn every_job_is_processed_exactly_once() {
        let jobs: Vec<u64> = (0..1000).collect();
        let queue = WorkQueue::new(jobs);
        let sum = AtomicU64::new(0);

        let partials = run_workers(&queue, 4, |queue| {
            let mut local = 0u64;
            while let Some(job) = queue.pop() {
                local += job;
            }
            local
        });

        let total: u64 = partials.into_iter().sum();
        sum.store(total, Ordering::Relaxed);
        assert_eq!(sum.load(Ordering::Relaxed), (0..1000u64).sum());
        assert_eq!(queue.remaining(), 0);
        assert_eq!(queue.progress(), 1.0);
    }

    #[test]
    fn empty_queue_reports_complete_progress() {
        let queue: WorkQueue<u32> = WorkQueue::new(Vec::new());
        assert_eq!(queue.progress(), 1.0);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn single_worker_drains_in_fifo_order() {
        let queue = WorkQueue::new(vec![1, 2, 3]);
        let results = run_workers(&queue, 1, |queue| {
            let mut seen = Vec::new();
            while let Some(job) = queue.pop() {
                seen.push(job);
            }
            seen
        });
        assert_eq!(results, vec![vec![1, 2, 3]]);
    }
}
