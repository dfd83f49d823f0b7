use thiserror::Error;

use crate::queue::BatchOutcome;

/// Error types for batch queue operations.
///
/// Transport and service failures surface here. Entries the service rejected
/// inside an otherwise successful batch call are not errors; they are reported
/// in [`BatchOutcome::failed`].
#[derive(Debug, Error)]
pub enum BatchQueueError {
    /// A call to the queue service failed as a whole (network, auth, throttling).
    #[error("{operation} request failed: {source}")]
    Service {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The SDK refused to build a request entry.
    #[error("failed to build {operation} entry: {message}")]
    BuildEntry {
        operation: &'static str,
        message: String,
    },

    /// The service did not return a queue URL where one was required.
    #[error("queue URL was not returned by the service")]
    MissingQueueUrl,

    /// A queue attribute was absent or could not be parsed.
    #[error("queue attribute {name} has an invalid value: {value:?}")]
    InvalidAttribute { name: String, value: Option<String> },

    /// One or more chunk requests of a batch operation failed.
    ///
    /// Every chunk is awaited before this is returned, so `completed` holds the
    /// outcome of each chunk that succeeded and `errors` each one that did not,
    /// both keyed by chunk index.
    #[error("{} of {total} batch requests failed", .errors.len())]
    Dispatch {
        total: usize,
        completed: Vec<(usize, BatchOutcome)>,
        errors: Vec<(usize, BatchQueueError)>,
    },
}

impl BatchQueueError {
    /// Wraps a service-level failure for the named operation.
    pub fn service<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BatchQueueError::Service {
            operation,
            source: Box::new(source),
        }
    }
}
