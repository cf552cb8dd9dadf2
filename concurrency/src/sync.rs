//! This module provides a completion barrier and a mutex-guarded counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future;
use tokio::sync::{Mutex, Notify};

use crate::Error;

/// A completion barrier counting outstanding units of work.
///
/// Each unit holds a [`Token`] taken from the group and releases it when done, either explicitly with
/// [`Token::done()`] or implicitly by dropping it (which also covers a unit unwinding on panic).
/// [`WaitGroup::wait()`] resolves once every token taken so far has been released.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use concurrency::sync::WaitGroup;
/// let wait_group = WaitGroup::new();
///
/// for i in 0..3 {
///     let token = wait_group.token();
///     tokio::spawn(async move {
///         println!("Hello from unit #{i}!");
///         token.done();
///     });
/// }
///
/// wait_group.wait().await;
/// assert_eq!(wait_group.count(), 0);
/// # })
/// ```
#[derive(Debug, Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// The number of tokens not released yet.
    count: AtomicUsize,
    /// Notifies waiters when the count drops to zero.
    notify: Notify,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new outstanding unit of work.
    pub fn token(&self) -> Token {
        self.inner.count.fetch_add(1, Ordering::AcqRel);

        Token {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Return the number of outstanding units of work.
    #[inline]
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait for all outstanding units of work to complete.
    ///
    /// Returns immediately when no token is held.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);

            // register as a waiter before checking the count so that a release in between is not missed
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }

            notified.await;
        }
    }
}

/// A unit of work registered in a [`WaitGroup`].
#[derive(Debug)]
#[must_use = "dropping a token releases it immediately"]
pub struct Token {
    inner: Arc<Inner>,
}

impl Token {
    /// Mark this unit of work as completed.
    #[inline]
    pub fn done(self) {}
}

impl Drop for Token {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.notify.notify_waiters();
        }
    }
}

/// A shared counter only ever accessed while holding its lock.
#[derive(Debug, Default)]
pub struct Counter {
    value: Mutex<u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter by one, releasing the lock right after.
    pub async fn increment(&self) {
        let mut value = self.value.lock().await;
        *value += 1;
    }

    pub async fn get(&self) -> u64 {
        *self.value.lock().await
    }
}

/// Spawn `units` tasks each incrementing a shared [`Counter`] `increments` times, and return its final value.
///
/// The final value is read only once every unit has completed, so it always equals `units * increments`.
pub async fn count_concurrently(units: usize, increments: usize) -> Result<u64, Error> {
    let counter = Arc::new(Counter::new());
    let wait_group = WaitGroup::new();

    let handles: Vec<_> = (0..units)
        .map(|id| {
            let counter = Arc::clone(&counter);
            let token = wait_group.token();

            tokio::spawn(async move {
                for _ in 0..increments {
                    counter.increment().await;
                }

                tracing::info!("Unit {id} completed");

                token.done();
            })
        })
        .collect();

    wait_group.wait().await;

    // every unit is done at this point, only surface a panicking one
    future::try_join_all(handles).await?;

    let value = counter.get().await;

    tracing::info!("Final counter value: {value}");

    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_wait_without_tokens() {
        let wait_group = WaitGroup::new();

        tokio::time::timeout(Duration::from_secs(1), wait_group.wait()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_tokens() {
        let wait_group = WaitGroup::new();

        let first = wait_group.token();
        let second = wait_group.token();
        assert_eq!(wait_group.count(), 2);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            first.done();
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(second);
        });

        wait_group.wait().await;
        assert_eq!(wait_group.count(), 0);
    }

    #[tokio::test]
    async fn test_token_released_on_panic() {
        let wait_group = WaitGroup::new();
        let token = wait_group.token();

        let handle = tokio::spawn(async move {
            let _token = token;
            panic!("unit failed");
        });

        wait_group.wait().await;
        assert!(handle.await.unwrap_err().is_panic());
    }

    #[tokio::test]
    async fn test_counter() {
        let counter = Counter::new();

        for _ in 0..3 {
            counter.increment().await;
        }

        assert_eq!(counter.get().await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[tracing_test::traced_test]
    async fn test_count_concurrently() {
        for _ in 0..100 {
            assert_eq!(count_concurrently(10, 1_000).await.unwrap(), 10_000);
        }

        assert!(logs_contain("Final counter value: 10000"));
    }

    #[tokio::test]
    async fn test_count_without_units() {
        assert_eq!(count_concurrently(0, 1_000).await.unwrap(), 0);
    }
}
