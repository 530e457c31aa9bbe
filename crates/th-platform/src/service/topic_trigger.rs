//! Topic Trigger Service
//!
//! Fans a workflow trigger out to a topic's current membership by
//! enqueueing one WORKFLOW job for the downstream trigger handler.

use std::sync::Arc;

use serde_json::{json, Value};
use th_common::{Job, JobTopicName, TenantScope};
use th_router::{JobHandle, JobTopicRouter};
use tracing::info;

use super::TopicRegistry;
use crate::error::Result;

#[derive(Clone)]
pub struct TopicTriggerService {
    registry: TopicRegistry,
    router: Arc<JobTopicRouter>,
}

impl TopicTriggerService {
    pub fn new(registry: TopicRegistry, router: Arc<JobTopicRouter>) -> Self {
        Self { registry, router }
    }

    /// Resolve the topic's members and hand a workflow job to the router.
    ///
    /// Dispatch failures are returned unchanged; retrying is the caller's decision.
    pub async fn trigger(
        &self,
        tenant: &TenantScope,
        topic_key: &str,
        workflow: &str,
        payload: Value,
    ) -> Result<JobHandle> {
        let topic = self.registry.get(tenant, topic_key).await?;
        let recipients = topic.subscribers.len();

        let job = Job::new(
            JobTopicName::Workflow,
            json!({
                "topicKey": topic.topic.key,
                "workflow": workflow,
                "subscribers": topic.subscribers,
                "payload": payload,
            }),
        )
        .with_tenant(tenant.clone());

        let handle = self.router.enqueue(job).await?;
        info!(
            tenant = %tenant,
            topic_key,
            workflow,
            recipients,
            job_id = %handle.job_id,
            queue = handle.queue,
            "Topic trigger dispatched"
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::repository::{InMemoryTopicRepository, TopicRepository};
    use crate::service::SubscriptionLedger;
    use th_common::ObservabilityTransactionTag;
    use th_queue::{EmbeddedQueue, QueueConsumer};
    use th_router::RouterConfig;

    async fn setup() -> (TopicTriggerService, Arc<EmbeddedQueue>, TenantScope) {
        let repo: Arc<dyn TopicRepository> = Arc::new(InMemoryTopicRepository::new());
        let ledger = SubscriptionLedger::new(repo.clone());
        let registry = TopicRegistry::new(repo, ledger.clone());
        let tenant = TenantScope::new("org", "env");

        registry.create(&tenant, "news", "News").await.unwrap();
        ledger
            .add_subscribers(&tenant, "news", vec!["s1".into(), "s2".into()])
            .await
            .unwrap();

        let broker = Arc::new(EmbeddedQueue::default());
        let router = Arc::new(JobTopicRouter::new(broker.clone(), RouterConfig::default()));
        (TopicTriggerService::new(registry, router), broker, tenant)
    }

    #[tokio::test]
    async fn test_trigger_enqueues_workflow_job() {
        let (service, broker, tenant) = setup().await;

        let handle = service
            .trigger(&tenant, "news", "welcome", json!({ "greeting": "hi" }))
            .await
            .unwrap();
        assert_eq!(handle.queue, "trigger-handler");
        assert_eq!(handle.observability_tag, Some(ObservabilityTransactionTag::TriggerHandlerQueue));

        let delivered = broker.poll("trigger-handler", 10).await.unwrap();
        assert_eq!(delivered.len(), 1);
        let message = &delivered[0];
        assert_eq!(message.id, handle.job_id);
        assert_eq!(message.tenant.as_ref(), Some(&tenant));
        assert_eq!(message.payload["topicKey"], "news");
        assert_eq!(message.payload["subscribers"], json!(["s1", "s2"]));
        assert_eq!(message.payload["payload"]["greeting"], "hi");
    }

    #[tokio::test]
    async fn test_unknown_topic_enqueues_nothing() {
        let (service, broker, tenant) = setup().await;

        let err = service.trigger(&tenant, "missing", "welcome", Value::Null).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { .. }));
        assert_eq!(broker.pending("trigger-handler").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_closed_broker_surfaces_dispatch_error() {
        let (service, broker, tenant) = setup().await;
        broker.close();

        let err = service.trigger(&tenant, "news", "welcome", Value::Null).await.unwrap_err();
        assert!(matches!(err, PlatformError::Dispatch(_)));
    }
}
