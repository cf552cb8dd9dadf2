//! This module provides a multiplexer racing several sources against a timeout.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::pipeline::UNBUFFERED;

/// A source sending a single message once its delay has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    label: String,
    delay: Duration,
}

impl Source {
    pub fn new(label: impl Into<String>, delay: Duration) -> Self {
        Self {
            label: label.into(),
            delay,
        }
    }

    /// Spawn the delayed sender and return the receiving part of its channel.
    fn spawn(self) -> mpsc::Receiver<String> {
        let (sender, receiver) = mpsc::channel(UNBUFFERED);

        tokio::spawn(async move {
            tokio::time::sleep(self.delay).await;

            tracing::trace!("Source `{}` fired after {:?}", self.label, self.delay);

            // the multiplexer may be done already, in which case the message is just lost
            let _ = sender.send(self.label).await;
        });

        receiver
    }
}

/// The outcome of a single multiplexer iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected {
    /// A source fired first with this message.
    Message(String),
    /// No source fired before the timeout elapsed.
    Timeout,
}

/// Wait `iterations` times on whichever comes first between both sources and `timeout`.
///
/// Every iteration restarts its own timeout. A source which has already fired cannot win again. When several
/// branches are ready at once, the winner is picked at random.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use std::time::Duration;
/// # use concurrency::select::{multiplex, Selected, Source};
/// let sources = [
///     Source::new("Channel 1", Duration::from_millis(20)),
///     Source::new("Channel 2", Duration::from_millis(10)),
/// ];
///
/// let selected = multiplex(sources, Duration::from_millis(300), 2).await;
///
/// assert_eq!(selected, [Selected::Message("Channel 2".into()), Selected::Message("Channel 1".into())]);
/// # })
/// ```
pub async fn multiplex(sources: [Source; 2], timeout: Duration, iterations: usize) -> Vec<Selected> {
    let [first, second] = sources;
    let (mut first, mut second) = (first.spawn(), second.spawn());

    let mut selected = Vec::with_capacity(iterations);

    for _ in 0..iterations {
        // a closed source disables its branch, the timeout branch always completes
        let outcome = tokio::select! {
            Some(message) = first.recv() => Selected::Message(message),
            Some(message) = second.recv() => Selected::Message(message),
            () = tokio::time::sleep(timeout) => Selected::Timeout,
        };

        match &outcome {
            Selected::Message(message) => tracing::info!("Received: {message}"),
            Selected::Timeout => tracing::info!("Timeout!"),
        }

        selected.push(outcome);
    }

    selected
}
