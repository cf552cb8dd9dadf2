//! This module provides the worker pool pattern.

use std::fmt;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{self, Future, FutureExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinHandle};

use crate::Error;

/// A fixed-size pool of workers sharing a single job queue and a single result queue.
///
/// Jobs are all pushed to the job queue before it is closed. Every worker then pulls jobs until the queue is
/// closed and drained, and pushes each result to the result queue. A [`Supervisor`] waits for all workers to
/// stop before closing the result queue, so that no result can be pushed to a closed queue and none is missing.
///
/// Workers race for jobs, hence results come in no particular order.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use std::num::NonZeroUsize;
/// # use concurrency::task::{double, Pool};
/// let pool = Pool::new(NonZeroUsize::new(3).unwrap());
/// let (mut results, supervisor) = pool.process(vec![1, 2, 3, 4, 5], double).await.unwrap();
///
/// let mut sum = 0;
/// while let Some(result) = results.recv().await {
///     sum += result;
/// }
///
/// supervisor.await.unwrap();
/// assert_eq!(sum, 30);
/// # })
/// ```
#[derive(Debug, Clone)]
pub struct Pool {
    /// The number of workers.
    size: NonZeroUsize,
    /// A simulated amount of work for every job.
    work_delay: Duration,
}

impl Pool {
    pub fn new(size: NonZeroUsize) -> Self {
        Self {
            size,
            work_delay: Duration::ZERO,
        }
    }

    /// Build a new `Pool` where every job takes at least `work_delay` to complete.
    #[inline]
    pub fn with_work_delay(self, work_delay: Duration) -> Self {
        Self { work_delay, ..self }
    }

    /// Process all `jobs` with `work` across the pool of workers.
    ///
    /// Returns the receiving part of the result queue, which reports closed once every worker has stopped,
    /// and the [`Supervisor`] to await for any worker failure.
    ///
    /// Without any job, the result queue is closed right away.
    pub async fn process<J, R, F>(&self, jobs: Vec<J>, work: F) -> Result<(mpsc::Receiver<R>, Supervisor), Error>
    where
        J: fmt::Debug + Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        // both queues can hold every job, so that loading jobs and pushing results never wait on a consumer
        let capacity = jobs.len().max(1);

        tracing::debug!("Processing {} jobs with {} workers...", jobs.len(), self.size);

        let (job_sender, job_receiver) = mpsc::channel(capacity);
        let (result_sender, result_receiver) = mpsc::channel(capacity);

        let receiver = Arc::new(Mutex::new(job_receiver));
        let work = Arc::new(work);

        let workers = (1..=self.size.get())
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&receiver),
                    result_sender.clone(),
                    Arc::clone(&work),
                    self.work_delay,
                )
            })
            .collect();

        for job in jobs {
            job_sender.send(job).await?;
        }

        // no more jobs
        drop(job_sender);

        Ok((result_receiver, Supervisor::new(workers, result_sender)))
    }
}

/// The job transform: double the job.
#[inline]
pub fn double(job: i64) -> i64 {
    job * 2
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: JoinHandle<Result<(), Error>>,
}

impl Worker {
    fn new<J, R, F>(
        id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<J>>>,
        results: mpsc::Sender<R>,
        work: Arc<F>,
        work_delay: Duration,
    ) -> Worker
    where
        J: fmt::Debug + Send + 'static,
        R: Send + 'static,
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        tracing::debug!("Starting worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                loop {
                    let message = receiver.lock().await.recv().await;

                    match message {
                        Some(job) => {
                            tracing::info!("Worker {id} processing job {job:?}");

                            tokio::time::sleep(work_delay).await;

                            results.send((*work)(job)).await?;
                        }
                        None => {
                            tracing::debug!("All jobs exhausted, shutting down worker {id}.");
                            break;
                        }
                    }
                }

                Ok::<_, Error>(())
            }),
        }
    }
}

impl Future for Worker {
    type Output = Result<Result<(), Error>, JoinError>;

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}

/// The task closing the result queue of a [`Pool`] once all of its workers have stopped.
///
/// Awaiting it returns the first worker failure, if any.
#[derive(Debug)]
pub struct Supervisor {
    handle: JoinHandle<Result<(), Error>>,
}

impl Supervisor {
    fn new<R: Send + 'static>(workers: Vec<Worker>, results: mpsc::Sender<R>) -> Self {
        Self {
            handle: tokio::spawn(async move {
                let outcomes = future::join_all(workers.into_iter().inspect(|worker| {
                    tracing::debug!("Waiting for worker {}...", worker.id);
                }))
                .await;

                // last sender, no worker can push any result from now on
                drop(results);

                tracing::debug!("All workers stopped, result queue closed.");

                for outcome in outcomes {
                    outcome??;
                }

                Ok::<_, Error>(())
            }),
        }
    }
}

impl Future for Supervisor {
    type Output = Result<(), Error>;

    #[inline]
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.handle.poll_unpin(cx).map(|outcome| outcome.map_err(Error::from).and_then(|result| result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(size: usize) -> Pool {
        Pool::new(NonZeroUsize::new(size).unwrap())
    }

    async fn drain(mut results: mpsc::Receiver<i64>) -> Vec<i64> {
        let mut values = vec![];

        while let Some(value) = results.recv().await {
            values.push(value);
        }

        values
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn test_pool() {
        let pool = pool(3).with_work_delay(Duration::from_millis(150));

        let (results, supervisor) = pool.process((1..=5).collect(), double).await.unwrap();

        let mut values = drain(results).await;
        supervisor.await.unwrap();

        values.sort_unstable();
        assert_eq!(values, [2, 4, 6, 8, 10]);
        assert!(logs_contain("Worker 1 processing job"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_under_contention() {
        let pool = pool(8);

        for _ in 0..50 {
            let (results, supervisor) = pool.process((1..=100).collect(), double).await.unwrap();

            let values = drain(results).await;
            supervisor.await.unwrap();

            assert_eq!(values.len(), 100);
            assert_eq!(values.iter().sum::<i64>(), 2 * (1..=100).sum::<i64>());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_without_jobs() {
        let (mut results, supervisor) = pool(3).process(Vec::<i64>::new(), double).await.unwrap();

        let closed = tokio::time::timeout(Duration::from_secs(1), results.recv()).await.unwrap();
        assert_eq!(closed, None);

        supervisor.await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_more_workers_than_jobs() {
        let (results, supervisor) = pool(10).process(vec![21], double).await.unwrap();

        assert_eq!(drain(results).await, [42]);
        supervisor.await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_dropped_results() {
        let (results, supervisor) = pool(3).process((1..=5).collect(), double).await.unwrap();

        drop(results);

        assert!(matches!(supervisor.await, Err(Error::Disconnected)));
    }

    #[tokio::test]
    async fn test_pool_panicking_worker() {
        let (results, supervisor) = pool(2)
            .process((1..=5).collect(), |job: i64| {
                assert_ne!(job, 3, "unlucky job");
                job
            })
            .await
            .unwrap();

        let values = drain(results).await;
        assert!(!values.contains(&3));

        assert!(matches!(supervisor.await, Err(Error::Join(err)) if err.is_panic()));
    }
}
