//! Amazon SQS publisher
//!
//! Each physical queue maps to `{queue_url_prefix}/{queue}`.

use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use th_common::QueueMessage;
use tracing::debug;

use crate::{QueueError, QueuePublisher, Result};

const TAG_ATTRIBUTE: &str = "observabilityTag";

pub struct SqsPublisher {
    client: aws_sdk_sqs::Client,
    queue_url_prefix: String,
}

impl SqsPublisher {
    pub fn new(client: aws_sdk_sqs::Client, queue_url_prefix: impl Into<String>) -> Self {
        Self {
            client,
            queue_url_prefix: queue_url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a publisher from the default AWS environment (region, credentials)
    pub async fn from_env(queue_url_prefix: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sqs::Client::new(&config), queue_url_prefix)
    }

    fn queue_url(&self, queue: &str) -> String {
        format!("{}/{}", self.queue_url_prefix, queue)
    }
}

#[async_trait]
impl QueuePublisher for SqsPublisher {
    fn identifier(&self) -> &str {
        &self.queue_url_prefix
    }

    async fn publish(&self, message: QueueMessage) -> Result<String> {
        let queue_url = self.queue_url(&message.queue);
        let body = serde_json::to_string(&message)?;

        let mut request = self.client.send_message()
            .queue_url(&queue_url)
            .message_body(body);

        if let Some(tag) = message.observability_tag {
            let attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(tag.as_str())
                .build()
                .map_err(|e| QueueError::Sqs(e.to_string()))?;
            request = request.message_attributes(TAG_ATTRIBUTE, attribute);
        }

        let output = request
            .send()
            .await
            .map_err(|e| QueueError::Sqs(e.to_string()))?;

        let broker_id = output.message_id().unwrap_or(&message.id).to_string();
        debug!(queue_url = %queue_url, message_id = %message.id, broker_id = %broker_id, "Published to SQS");
        Ok(broker_id)
    }
}
