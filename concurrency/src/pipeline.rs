//! This module provides a generator feeding a transformer through channels.
//!
//! ```text
//!     generate ──(1, 2, 3, ..)──▶ square ──(1, 4, 9, ..)──▶ consumer
//! ```
//!
//! Each stage owns the sending part of its output channel and closes it by dropping it once done. A downstream
//! stage stops as soon as its input channel is closed and drained, so closing cascades from the generator to the
//! consumer.

use std::time::Duration;

use futures::future::{self, Future, TryFutureExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Error;

/// The capacity of a channel standing for an unbuffered one.
///
/// Tokio channels cannot be created without any slot, a single one keeps every send waiting on the consumer
/// as soon as one value is pending.
pub const UNBUFFERED: usize = 1;

/// Send the sequence `1..=count` in order, waiting `delay` after every value, then close the channel.
pub async fn generate(count: i64, delay: Duration, sender: mpsc::Sender<i64>) -> Result<(), Error> {
    for i in 1..=count {
        tracing::info!("Generating number: {i}");

        sender.send(i).await?;

        tokio::time::sleep(delay).await;
    }

    tracing::debug!("Generator exhausted, closing its channel.");

    Ok(())
}

/// Square every value received until the input channel is closed and drained, then close the output channel.
///
/// Stops with [`Error::Overflow`] on the first value whose square does not fit an `i64`.
pub async fn square(mut receiver: mpsc::Receiver<i64>, sender: mpsc::Sender<i64>) -> Result<(), Error> {
    while let Some(num) = receiver.recv().await {
        let result = num.checked_mul(num).ok_or(Error::Overflow(num))?;

        tracing::info!("Squaring {num}: {result}");

        sender.send(result).await?;
    }

    tracing::debug!("Input channel drained, closing the squared channel.");

    Ok(())
}

/// Spawn both stages chained together on unbuffered channels.
///
/// Returns the receiving part of the squared sequence and a future resolving once both stages have stopped.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use std::time::Duration;
/// # use concurrency::pipeline;
/// let (mut squares, stages) = pipeline::spawn(3, Duration::ZERO);
///
/// while let Some(square) = squares.recv().await {
///     println!("Received squared result: {square}");
/// }
///
/// stages.await.unwrap();
/// # })
/// ```
/// ```text
/// Received squared result: 1
/// Received squared result: 4
/// Received squared result: 9
/// ```
pub fn spawn(count: i64, delay: Duration) -> (mpsc::Receiver<i64>, impl Future<Output = Result<(), Error>>) {
    let (number_sender, number_receiver) = mpsc::channel(UNBUFFERED);
    let (square_sender, square_receiver) = mpsc::channel(UNBUFFERED);

    let generator = tokio::spawn(generate(count, delay, number_sender));
    let transformer = tokio::spawn(square(number_receiver, square_sender));

    let stages = future::try_join(join(generator), join(transformer)).map_ok(|_| ());

    (square_receiver, stages)
}

async fn join(handle: JoinHandle<Result<(), Error>>) -> Result<(), Error> {
    handle.await?
}
