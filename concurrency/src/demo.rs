//! This module chains every pattern into a single sequential demonstration.

use std::time::Duration;

use futures::future;
use tokio::sync::mpsc;
use tracing::{Level, Subscriber};

use crate::config::Config;
use crate::select::{self, Selected, Source};
use crate::sync::{self, WaitGroup};
use crate::task::{self, Pool};
use crate::{pipeline, Error};

/// Values observed by every block of a demonstration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub squares: Vec<i64>,
    pub buffered: Vec<String>,
    /// Doubled jobs, in arrival order.
    pub results: Vec<i64>,
    pub selected: Vec<Selected>,
    pub counter: u64,
}

/// Run every block in sequence, each one starting once the previous one is over.
pub async fn run(config: &Config) -> Result<Report, Error> {
    tracing::info!("Concurrency patterns:");

    section("Basic Tasks");
    greet(config.greeters, config.greet_delay).await?;

    section("Channels Example");
    let squares = squares(config.items, config.generate_delay).await?;

    section("Buffered Channel");
    let buffered = buffered(&config.buffered).await?;

    section("Worker Pool Pattern");
    let pool = Pool::new(config.workers).with_work_delay(config.work_delay);
    let results = doubles(&pool, (1..=config.jobs).collect()).await?;

    section("Select Statement");
    let sources = config
        .sources
        .clone()
        .map(|(label, delay)| Source::new(label, delay));
    let selected = select::multiplex(sources, config.select_timeout, config.select_iterations).await;

    section("Mutex Example");
    let counter = sync::count_concurrently(config.counter_units, config.counter_increments).await?;

    tracing::info!("");
    tracing::info!("Concurrency examples completed");

    Ok(Report {
        squares,
        buffered,
        results,
        selected,
        counter,
    })
}

/// Build the subscriber printing every progress line to stdout.
///
/// The level is pinned to `INFO`, progress lines are the output of the demonstration and cannot be filtered out.
pub fn subscriber() -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_max_level(Level::INFO)
        .without_time()
        .with_target(false)
        .with_level(false)
        .finish()
}

/// Log a section heading preceded by a blank line.
fn section(title: &str) {
    tracing::info!("");
    tracing::info!("=== {title} ===");
}

/// Spawn `greeters` units, unit `id` saying hello, sleeping `id * delay` and saying goodbye, and wait for all of them.
pub async fn greet(greeters: u32, delay: Duration) -> Result<(), Error> {
    let wait_group = WaitGroup::new();

    let handles: Vec<_> = (1..=greeters)
        .map(|id| {
            let token = wait_group.token();

            tokio::spawn(async move {
                tracing::info!("Hello from task {id}");
                tokio::time::sleep(delay * id).await;
                tracing::info!("Goodbye from task {id}");

                token.done();
            })
        })
        .collect();

    wait_group.wait().await;
    future::try_join_all(handles).await?;

    tracing::info!("All tasks completed");

    Ok(())
}

async fn squares(items: i64, delay: Duration) -> Result<Vec<i64>, Error> {
    let (mut receiver, stages) = pipeline::spawn(items, delay);

    let mut squares = vec![];

    while let Some(square) = receiver.recv().await {
        tracing::info!("Received squared result: {square}");
        squares.push(square);
    }

    stages.await?;

    Ok(squares)
}

/// Fill a buffered channel with `messages` before receiving any of them, then receive them all in order.
pub async fn buffered(messages: &[String]) -> Result<Vec<String>, Error> {
    let (sender, mut receiver) = mpsc::channel(messages.len().max(1));

    // the channel has room for every message, nothing needs to be received yet
    for message in messages {
        sender.send(message.clone()).await?;
    }

    drop(sender);

    let mut received = Vec::with_capacity(messages.len());

    while let Some(message) = receiver.recv().await {
        tracing::info!("{message}");
        received.push(message);
    }

    Ok(received)
}

async fn doubles(pool: &Pool, jobs: Vec<i64>) -> Result<Vec<i64>, Error> {
    let (mut receiver, supervisor) = pool.process(jobs, task::double).await?;

    let mut results = vec![];

    while let Some(result) = receiver.recv().await {
        tracing::info!("Result: {result}");
        results.push(result);
    }

    supervisor.await?;

    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;

    fn sorted(mut values: Vec<i64>) -> Vec<i64> {
        values.sort_unstable();
        values
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn test_run() {
        let report = run(&Config::default()).await.unwrap();

        assert_eq!(report.squares, [1, 4, 9, 16, 25]);
        assert_eq!(report.buffered, ["First", "Second", "Third"]);
        assert_eq!(sorted(report.results), [2, 4, 6, 8, 10]);
        assert_eq!(
            report.selected,
            [
                Selected::Message("Channel 2".into()),
                Selected::Message("Channel 1".into())
            ]
        );
        assert_eq!(report.counter, 10_000);

        assert!(logs_contain("=== Worker Pool Pattern ==="));
        assert!(logs_contain("Concurrency examples completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_twice() {
        let config = Config::default().with_counter(4, 250);

        let first = run(&config).await.unwrap();
        let second = run(&config).await.unwrap();

        assert_eq!(first.squares, second.squares);
        assert_eq!(first.buffered, second.buffered);
        assert_eq!(sorted(first.results), sorted(second.results));
        assert_eq!(first.selected, second.selected);
        assert_eq!(first.counter, 1_000);
        assert_eq!(second.counter, 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_items_nor_jobs() {
        let config = Config::default()
            .with_items(0)
            .with_jobs(0)
            .with_workers(NonZeroUsize::new(1).unwrap());

        let report = run(&config).await.unwrap();

        assert!(report.squares.is_empty());
        assert!(report.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn test_greet() {
        let start = tokio::time::Instant::now();

        greet(3, Duration::from_millis(100)).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(logs_contain("Hello from task 1"));
        assert!(logs_contain("Goodbye from task 3"));
        assert!(logs_contain("All tasks completed"));
    }

    #[test]
    fn test_subscriber_shows_progress_lines() {
        tracing::subscriber::with_default(subscriber(), || {
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));
        });
    }

    #[tokio::test]
    async fn test_buffered_fifo() {
        let messages = ["First", "Second", "Third"].map(String::from);

        assert_eq!(buffered(&messages).await.unwrap(), messages);
    }
}
