use thiserror::Error;
use th_queue::QueueError;

/// Enqueue failed; the producer may retry with backoff
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Broker did not acknowledge message for queue {queue} within {timeout_ms}ms")]
    Timeout { queue: String, timeout_ms: u64 },

    #[error("Broker rejected message for queue {queue}: {source}")]
    Rejected {
        queue: String,
        #[source]
        source: QueueError,
    },
}

impl DispatchError {
    pub fn queue(&self) -> &str {
        match self {
            DispatchError::Timeout { queue, .. } => queue,
            DispatchError::Rejected { queue, .. } => queue,
        }
    }
}
