//! Bounded worker pool.
//!
//! At most `size` submitted jobs run at once; the rest wait for a permit.
//! The pool is a `JoinSet` of tasks gated by a semaphore, with explicit
//! lifecycle operations: [`submit`](WorkerPool::submit),
//! [`probe`](WorkerPool::probe) for a non-blocking check on jobs that have
//! already ended, [`close`](WorkerPool::close) followed by
//! [`join_all`](WorkerPool::join_all) for a graceful finish, and
//! [`cancel_all`](WorkerPool::cancel_all) to abort everything outstanding.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::core::FetchdepError;

/// A fixed-size pool of concurrent jobs.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    closed: bool,
}

fn panic_fault(e: &JoinError) -> Option<FetchdepError> {
    e.is_panic().then(|| FetchdepError::WorkerPool {
        message: format!("worker panicked: {e}"),
    })
}

impl WorkerPool {
    /// Create a pool running at most `size` jobs at once (minimum one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            semaphore: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
            closed: false,
        }
    }

    /// Maximum number of concurrently running jobs.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Jobs submitted and not yet reaped.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Submit a job.
    ///
    /// # Errors
    ///
    /// [`FetchdepError::WorkerPool`] if the pool has been closed.
    pub fn submit<F>(&mut self, job: F) -> Result<(), FetchdepError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed {
            return Err(FetchdepError::WorkerPool {
                message: "pool is closed to new jobs".to_string(),
            });
        }

        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            // a closed semaphore means the pool was cancelled before this job started
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            job.await;
        });
        Ok(())
    }

    /// Reap jobs that have already ended, without waiting.
    ///
    /// # Errors
    ///
    /// [`FetchdepError::WorkerPool`] if one of them panicked.
    pub fn probe(&mut self) -> Result<(), FetchdepError> {
        while let Some(result) = self.tasks.try_join_next() {
            if let Some(fault) = result.err().as_ref().and_then(panic_fault) {
                return Err(fault);
            }
        }
        Ok(())
    }

    /// Stop accepting new jobs.
    pub const fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the pool still accepts jobs.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for every submitted job to finish.
    ///
    /// # Errors
    ///
    /// [`FetchdepError::WorkerPool`] if any job panicked; the remaining jobs
    /// are still waited for.
    pub async fn join_all(&mut self) -> Result<(), FetchdepError> {
        let mut first_fault = None;
        while let Some(result) = self.tasks.join_next().await {
            if first_fault.is_none() {
                first_fault = result.err().as_ref().and_then(panic_fault);
            }
        }
        first_fault.map_or(Ok(()), Err)
    }

    /// Abort every outstanding job and wait for the aborts to land.
    pub async fn cancel_all(&mut self) {
        self.closed = true;
        self.semaphore.close();
        self.tasks.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_respects_parallelism_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let observed_max = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPool::new(3);
        for _ in 0..8 {
            let active = Arc::clone(&active);
            let observed_max = Arc::clone(&observed_max);
            let finished = Arc::clone(&finished);
            pool.submit(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                observed_max.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.close();
        pool.join_all().await.unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 8);
        assert!(observed_max.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_jobs() {
        let mut pool = WorkerPool::new(1);
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.submit(async {}), Err(FetchdepError::WorkerPool { .. })));
    }

    #[tokio::test]
    async fn test_zero_size_runs_one_at_a_time() {
        assert_eq!(WorkerPool::new(0).size(), 1);
    }

    #[tokio::test]
    async fn test_panic_surfaces_as_fault() {
        let mut pool = WorkerPool::new(2);
        pool.submit(async { panic!("simulated panic") }).unwrap();
        pool.submit(async {}).unwrap();

        pool.close();
        let err = pool.join_all().await.unwrap_err();
        assert!(err.to_string().contains("worker panicked"), "{err}");
    }

    #[tokio::test]
    async fn test_probe_is_non_blocking() {
        let mut pool = WorkerPool::new(1);
        pool.submit(tokio::time::sleep(Duration::from_secs(60))).unwrap();

        // the job is still running; probing must not wait for it
        pool.probe().unwrap();
        assert_eq!(pool.in_flight(), 1);

        pool.cancel_all().await;
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_probe_reports_panics() {
        let mut pool = WorkerPool::new(1);
        pool.submit(async { panic!("immediate") }).unwrap();

        let mut result = Ok(());
        for _ in 0..50 {
            result = pool.probe();
            if result.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(matches!(result, Err(FetchdepError::WorkerPool { .. })));
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_queued_and_running_jobs() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(1);

        for _ in 0..3 {
            let started = Arc::clone(&started);
            pool.submit(async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.cancel_all().await;

        assert!(started.load(Ordering::SeqCst) <= 1);
        assert!(matches!(pool.submit(async {}), Err(FetchdepError::WorkerPool { .. })));
    }
}
