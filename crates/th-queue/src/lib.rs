//! Queue broker collaborators
//!
//! - `QueuePublisher`: hands a routed message to the broker and waits for its acknowledgement
//! - `QueueConsumer`: drains a physical queue on behalf of the worker bound to it
//! - `EmbeddedQueue`: in-process FIFO broker for development and tests
//! - `SqsPublisher`: Amazon SQS backend (feature `sqs`)

use async_trait::async_trait;
use th_common::QueueMessage;
use thiserror::Error;

pub mod embedded;
#[cfg(feature = "sqs")]
pub mod sqs;

pub use embedded::{EmbeddedQueue, EmbeddedQueueConfig};
#[cfg(feature = "sqs")]
pub use sqs::SqsPublisher;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue {queue} is full (capacity {capacity})")]
    Full { queue: String, capacity: usize },

    #[error("Broker rejected message: {0}")]
    Rejected(String),

    #[error("Broker is closed")]
    Closed,

    #[error("SQS error: {0}")]
    Sqs(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Producer side of the broker.
///
/// `publish` resolves only once the broker has accepted the message; the
/// returned string is the broker's message id.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    fn identifier(&self) -> &str;

    async fn publish(&self, message: QueueMessage) -> Result<String>;
}

/// Worker side of the broker
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Remove and return up to `max_messages` from the head of `queue`
    async fn poll(&self, queue: &str, max_messages: usize) -> Result<Vec<QueueMessage>>;

    /// Messages waiting in `queue`
    async fn pending(&self, queue: &str) -> Result<u64>;
}
