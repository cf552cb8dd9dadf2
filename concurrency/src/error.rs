use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError;

#[derive(Debug, Error)]
pub enum Error {
    /// A stage tried to send a value while the receiving end was already dropped.
    #[error("channel receiver has been dropped")]
    Disconnected,
    /// A value fell outside of the `i64` range while being transformed.
    #[error("squaring {0} overflows")]
    Overflow(i64),
    /// A spawned unit of work panicked.
    #[error(transparent)]
    Join(#[from] JoinError),
    #[error(transparent)]
    Subscriber(#[from] SetGlobalDefaultError),
}

impl<T> From<SendError<T>> for Error {
    #[inline]
    fn from(_: SendError<T>) -> Self {
        Self::Disconnected
    }
}
