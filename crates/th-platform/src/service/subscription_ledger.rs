//! Subscription Ledger
//!
//! Owns topic membership. Mutations are set operations: repeating them is
//! harmless and never an error.

use std::sync::Arc;

use th_common::TenantScope;
use tracing::info;

use super::ensure_tenant;
use crate::domain::{SubscriberMutation, Topic};
use crate::error::{PlatformError, Result};
use crate::repository::TopicRepository;

#[derive(Clone)]
pub struct SubscriptionLedger {
    repo: Arc<dyn TopicRepository>,
}

impl SubscriptionLedger {
    pub fn new(repo: Arc<dyn TopicRepository>) -> Self {
        Self { repo }
    }

    /// Add every id to the topic's set and echo the whole input back.
    ///
    /// Ids already present count as succeeded; subscriber existence is not checked.
    pub async fn add_subscribers(
        &self,
        tenant: &TenantScope,
        topic_key: &str,
        subscribers: Vec<String>,
    ) -> Result<SubscriberMutation> {
        self.require_topic(tenant, topic_key).await?;
        self.repo.upsert_membership(tenant, topic_key, &subscribers).await?;

        info!(tenant = %tenant, topic_key, count = subscribers.len(), "Subscribers added to topic");
        Ok(SubscriberMutation { succeeded: subscribers })
    }

    /// Remove every id from the topic's set. Ids that were never members count as succeeded.
    pub async fn remove_subscribers(
        &self,
        tenant: &TenantScope,
        topic_key: &str,
        subscribers: Vec<String>,
    ) -> Result<SubscriberMutation> {
        self.require_topic(tenant, topic_key).await?;
        self.repo.remove_membership(tenant, topic_key, &subscribers).await?;

        info!(tenant = %tenant, topic_key, count = subscribers.len(), "Subscribers removed from topic");
        Ok(SubscriberMutation { succeeded: subscribers })
    }

    pub async fn members_of(&self, tenant: &TenantScope, topic_key: &str) -> Result<Vec<String>> {
        self.repo.members_of(tenant, topic_key).await
    }

    async fn require_topic(&self, tenant: &TenantScope, topic_key: &str) -> Result<Topic> {
        let topic = self
            .repo
            .find_topic(tenant, topic_key)
            .await?
            .ok_or_else(|| PlatformError::not_found("Topic", topic_key))?;
        ensure_tenant(tenant, &topic)?;
        Ok(topic)
    }
}
