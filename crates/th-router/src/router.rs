//! JobTopicRouter - static job-topic → queue mapping in front of the broker

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use th_common::{Job, JobTopicName, ObservabilityTransactionTag, QueueMessage};
use th_queue::QueuePublisher;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Upper bound on waiting for the broker's acknowledgement
    pub enqueue_timeout_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enqueue_timeout_ms: 5_000,
        }
    }
}

/// Where a job topic lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRoute {
    pub queue: &'static str,
    pub observability_tag: Option<ObservabilityTransactionTag>,
}

/// Receipt for an acknowledged enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
    pub broker_message_id: String,
    pub job_topic_name: JobTopicName,
    pub queue: &'static str,
    pub observability_tag: Option<ObservabilityTransactionTag>,
}

/// Stateless apart from the broker handle; safe to share across producers.
#[derive(Clone)]
pub struct JobTopicRouter {
    publisher: Arc<dyn QueuePublisher>,
    enqueue_timeout: Duration,
}

impl JobTopicRouter {
    pub fn new(publisher: Arc<dyn QueuePublisher>, config: RouterConfig) -> Self {
        Self {
            publisher,
            enqueue_timeout: Duration::from_millis(config.enqueue_timeout_ms),
        }
    }

    pub fn route(job_topic_name: JobTopicName) -> JobRoute {
        JobRoute {
            queue: job_topic_name.queue_name(),
            observability_tag: job_topic_name.observability_tag(),
        }
    }

    /// Publish `job` on the queue bound to its topic name.
    ///
    /// Returns once the broker has acknowledged receipt; a rejection or a
    /// missing acknowledgement within the configured timeout is an error.
    pub async fn enqueue(&self, job: Job) -> Result<JobHandle> {
        let name = job.job_topic_name;
        let route = Self::route(name);
        let message = QueueMessage::from_job(job);
        let job_id = message.id.clone();
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.enqueue_timeout, self.publisher.publish(message)).await;
        metrics::histogram!("th_enqueue_duration_seconds", "queue" => route.queue)
            .record(started.elapsed().as_secs_f64());

        let broker_message_id = match outcome {
            Ok(Ok(id)) => id,
            Ok(Err(source)) => {
                metrics::counter!("th_jobs_failed_total", "queue" => route.queue, "reason" => "rejected")
                    .increment(1);
                warn!(
                    job_topic = %name,
                    queue = route.queue,
                    job_id = %job_id,
                    broker = self.publisher.identifier(),
                    error = %source,
                    "Broker rejected job"
                );
                return Err(DispatchError::Rejected {
                    queue: route.queue.to_string(),
                    source,
                });
            }
            Err(_) => {
                metrics::counter!("th_jobs_failed_total", "queue" => route.queue, "reason" => "timeout")
                    .increment(1);
                let timeout_ms = self.enqueue_timeout.as_millis() as u64;
                warn!(
                    job_topic = %name,
                    queue = route.queue,
                    job_id = %job_id,
                    timeout_ms,
                    "Broker acknowledgement timed out"
                );
                return Err(DispatchError::Timeout {
                    queue: route.queue.to_string(),
                    timeout_ms,
                });
            }
        };

        metrics::counter!("th_jobs_enqueued_total", "queue" => route.queue).increment(1);
        debug!(
            job_topic = %name,
            queue = route.queue,
            tag = ?route.observability_tag.map(|t| t.as_str()),
            job_id = %job_id,
            broker_message_id = %broker_message_id,
            "Job enqueued"
        );

        Ok(JobHandle {
            job_id,
            broker_message_id,
            job_topic_name: name,
            queue: route.queue,
            observability_tag: route.observability_tag,
        })
    }
}
