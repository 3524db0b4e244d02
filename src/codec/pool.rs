//! Fixed-size worker pool with send/gather semantics.
//!
//! The pool is a `rayon` thread pool with exactly as many threads as workers.
//! [`WorkerPool::gather`] sends one item to each rank, lets every worker run,
//! and blocks until the phase is over. Replies travel back over a channel tagged
//! with the sender's rank and are slotted by rank, so the result order is the
//! partition order no matter which worker finishes first. Rank 0 is the
//! coordinator's own share and runs inside the gathering scope.

use crate::codec::Result;
use crate::error::Error;
use log::{trace, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

/// A pool of `size` cooperating workers.
pub struct WorkerPool {
    pool: ThreadPool,
    size: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}

impl WorkerPool {
    /// Creates a pool of `size` workers.
    ///
    /// # Returns
    ///
    /// An error if `size` is zero or the threads cannot be started
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidInput(
                "Worker pool size must be positive".to_string(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|rank| format!("parhuff-worker-{}", rank))
            .build()
            .map_err(|e| Error::InvalidInput(format!("Cannot start worker pool: {}", e)))?;

        Ok(WorkerPool { pool, size })
    }

    /// Number of workers, the coordinator included
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sends `items[rank]` to worker `rank`, runs `work` on each, and gathers
    /// the replies.
    ///
    /// # Returns
    ///
    /// One result per item, indexed by rank. The first worker error is
    /// propagated; a worker that panics never replies and yields
    /// `Error::WorkerUnavailable`.
    pub fn gather<T, R, F>(&self, items: Vec<T>, work: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> Result<R> + Sync,
    {
        let expected = items.len();
        let (tx, rx) = mpsc::channel::<(usize, Result<R>)>();
        let work = &work;

        self.pool.scope(|scope| {
            let mut items = items.into_iter().enumerate();
            let own = items.next();

            for (rank, item) in items {
                let tx = tx.clone();
                scope.spawn(move |_| run(rank, item, work, &tx));
            }

            if let Some((rank, item)) = own {
                run(rank, item, work, &tx);
            }
        });
        drop(tx);

        let mut slots: Vec<Option<Result<R>>> = (0..expected).map(|_| None).collect();
        for (rank, reply) in rx {
            slots[rank] = Some(reply);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(rank, slot)| slot.unwrap_or(Err(Error::WorkerUnavailable { rank })))
            .collect()
    }
}

fn run<T, R, F>(rank: usize, item: T, work: &F, tx: &mpsc::Sender<(usize, Result<R>)>)
where
    F: Fn(usize, T) -> Result<R>,
{
    trace!("worker {} received its range", rank);
    match panic::catch_unwind(AssertUnwindSafe(|| work(rank, item))) {
        Ok(reply) => {
            // The receiver outlives the scope, so this cannot fail.
            let _ = tx.send((rank, reply));
        }
        Err(_) => warn!("worker {} panicked before replying", rank),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_zero_size_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }

    #[test]
    fn test_results_in_rank_order() {
        let pool = WorkerPool::new(4).unwrap();
        let items: Vec<u64> = vec![40, 30, 20, 10];
        // Lower ranks sleep longer so they finish last.
        let results = pool
            .gather(items, |rank, millis| {
                thread::sleep(Duration::from_millis(millis));
                Ok(rank * 100)
            })
            .unwrap();
        assert_eq!(results, vec![0, 100, 200, 300]);
    }

    #[test]
    fn test_borrowed_items() {
        let pool = WorkerPool::new(3).unwrap();
        let content = b"hello world".to_vec();
        let items: Vec<&[u8]> = content.chunks(4).collect();
        let lens = pool.gather(items, |_, chunk| Ok(chunk.len())).unwrap();
        assert_eq!(lens, vec![4, 4, 3]);
    }

    #[test]
    fn test_worker_error_propagates() {
        let pool = WorkerPool::new(2).unwrap();
        let result: Result<Vec<()>> = pool.gather(vec![0, 1], |rank, _| {
            if rank == 1 {
                Err(Error::EmptyAlphabet)
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(Error::EmptyAlphabet)));
    }

    #[test]
    fn test_panicking_worker_is_unavailable() {
        let pool = WorkerPool::new(3).unwrap();
        let result: Result<Vec<usize>> = pool.gather(vec![0, 1, 2], |rank, _: i32| {
            if rank == 2 {
                panic!("worker lost");
            }
            Ok(rank)
        });
        assert!(matches!(result, Err(Error::WorkerUnavailable { rank: 2 })));
    }

    #[test]
    fn test_more_items_than_threads() {
        let pool = WorkerPool::new(2).unwrap();
        let results = pool.gather((0..6).collect(), |_, x: u32| Ok(x * x)).unwrap();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25]);
    }
}
