//! In-process broker with one bounded FIFO per physical queue

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use th_common::QueueMessage;
use tracing::{debug, info};

use crate::{QueueConsumer, QueueError, QueuePublisher, Result};

#[derive(Debug, Clone)]
pub struct EmbeddedQueueConfig {
    /// Maximum messages held per queue before publishes are rejected
    pub capacity_per_queue: usize,
}

impl Default for EmbeddedQueueConfig {
    fn default() -> Self {
        Self {
            capacity_per_queue: 10_000,
        }
    }
}

pub struct EmbeddedQueue {
    config: EmbeddedQueueConfig,
    queues: DashMap<String, VecDeque<QueueMessage>>,
    closed: AtomicBool,
}

impl EmbeddedQueue {
    pub fn new(config: EmbeddedQueueConfig) -> Self {
        info!(capacity_per_queue = config.capacity_per_queue, "Embedded queue started");
        Self {
            config,
            queues: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Stop accepting publishes. Queued messages stay available to consumers.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Embedded queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for EmbeddedQueue {
    fn default() -> Self {
        Self::new(EmbeddedQueueConfig::default())
    }
}

#[async_trait]
impl QueuePublisher for EmbeddedQueue {
    fn identifier(&self) -> &str {
        "embedded"
    }

    async fn publish(&self, message: QueueMessage) -> Result<String> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let mut queue = self.queues.entry(message.queue.clone()).or_default();
        if queue.len() >= self.config.capacity_per_queue {
            return Err(QueueError::Full {
                queue: message.queue.clone(),
                capacity: self.config.capacity_per_queue,
            });
        }

        let id = message.id.clone();
        debug!(queue = %message.queue, message_id = %id, depth = queue.len() + 1, "Message queued");
        queue.push_back(message);
        Ok(id)
    }
}

#[async_trait]
impl QueueConsumer for EmbeddedQueue {
    async fn poll(&self, queue: &str, max_messages: usize) -> Result<Vec<QueueMessage>> {
        let Some(mut entries) = self.queues.get_mut(queue) else {
            return Ok(Vec::new());
        };
        let take = max_messages.min(entries.len());
        Ok(entries.drain(..take).collect())
    }

    async fn pending(&self, queue: &str) -> Result<u64> {
        Ok(self.queues.get(queue).map(|q| q.len() as u64).unwrap_or(0))
    }
}
