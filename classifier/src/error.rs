use thiserror::Error;

/// Ways a classification request can fail.
///
/// A failed classification cancels the current scan session; it never
/// touches the actuators and is never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The service is unreachable, errored, or already busy with the one
    /// in-flight request this system allows.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    /// The request exceeded the configured deadline.
    #[error("classification timed out")]
    Timeout,
    /// The service answered with something we cannot use.
    #[error("classifier rejected input: {0}")]
    InvalidInput(String),
}
