//! Topic Registry
//!
//! Creation, lookup and paginated listing of topics. Results are hydrated
//! with membership from the [`SubscriptionLedger`].

use std::sync::Arc;

use th_common::TenantScope;
use tracing::{debug, info};

use super::{ensure_tenant, SubscriptionLedger};
use crate::domain::{Topic, TopicWithSubscribers};
use crate::error::{PlatformError, Result};
use crate::repository::{PageRequest, TopicFilter, TopicRepository};
use crate::validation::TopicQuery;

/// One page of hydrated topics
#[derive(Debug, Clone)]
pub struct TopicListing {
    pub items: Vec<TopicWithSubscribers>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Clone)]
pub struct TopicRegistry {
    repo: Arc<dyn TopicRepository>,
    ledger: SubscriptionLedger,
}

impl TopicRegistry {
    pub fn new(repo: Arc<dyn TopicRepository>, ledger: SubscriptionLedger) -> Self {
        Self { repo, ledger }
    }

    /// Fails with `Duplicate` when the tenant already owns `key`
    pub async fn create(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Topic> {
        let topic = self.repo.create_topic(tenant, key, name).await?;
        info!(tenant = %tenant, topic_id = %topic.id, key, "Topic created");
        Ok(topic)
    }

    pub async fn list(&self, tenant: &TenantScope, query: &TopicQuery) -> Result<TopicListing> {
        let filter = TopicFilter { key: query.key.clone() };
        let page = self
            .repo
            .find_topics(tenant, &filter, PageRequest::new(query.page, query.page_size))
            .await?;

        let mut items = Vec::with_capacity(page.items.len());
        for topic in page.items {
            items.push(self.hydrate(tenant, topic).await?);
        }

        debug!(
            tenant = %tenant,
            returned = items.len(),
            total_count = page.total_count,
            page = query.page,
            "Listed topics"
        );

        Ok(TopicListing {
            items,
            total_count: page.total_count,
            page: query.page,
            page_size: query.page_size,
        })
    }

    pub async fn get(&self, tenant: &TenantScope, key: &str) -> Result<TopicWithSubscribers> {
        let topic = self
            .repo
            .find_topic(tenant, key)
            .await?
            .ok_or_else(|| PlatformError::not_found("Topic", key))?;
        self.hydrate(tenant, topic).await
    }

    /// Change the display name; the key never changes
    pub async fn rename(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<TopicWithSubscribers> {
        let topic = self
            .repo
            .rename_topic(tenant, key, name)
            .await?
            .ok_or_else(|| PlatformError::not_found("Topic", key))?;
        info!(tenant = %tenant, topic_id = %topic.id, key, "Topic renamed");
        self.hydrate(tenant, topic).await
    }

    async fn hydrate(&self, tenant: &TenantScope, topic: Topic) -> Result<TopicWithSubscribers> {
        ensure_tenant(tenant, &topic)?;
        let subscribers = self.ledger.members_of(tenant, &topic.key).await?;
        Ok(TopicWithSubscribers { topic, subscribers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryTopicRepository, TopicPage};
    use async_trait::async_trait;

    fn registry() -> TopicRegistry {
        let repo: Arc<dyn TopicRepository> = Arc::new(InMemoryTopicRepository::new());
        TopicRegistry::new(repo.clone(), SubscriptionLedger::new(repo))
    }

    fn query(key: Option<&str>, page: u32, page_size: u32) -> TopicQuery {
        TopicQuery {
            key: key.map(String::from),
            page,
            page_size,
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_hydrates() {
        let registry = registry();
        let tenant = TenantScope::new("org", "env");
        for key in ["topic-key-1", "topic-key-3", "topic-key-2"] {
            registry.create(&tenant, key, key).await.unwrap();
        }
        registry
            .ledger
            .add_subscribers(&tenant, "topic-key-2", vec!["s1".into(), "s2".into()])
            .await
            .unwrap();

        let all = registry.list(&tenant, &query(None, 0, 10)).await.unwrap();
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.total_count, 3);
        let keys: Vec<&str> = all.items.iter().map(|t| t.topic.key.as_str()).collect();
        assert_eq!(keys, vec!["topic-key-1", "topic-key-3", "topic-key-2"]);

        let one = registry.list(&tenant, &query(Some("topic-key-2"), 0, 10)).await.unwrap();
        assert_eq!(one.total_count, 1);
        assert_eq!(one.items[0].subscribers, vec!["s1", "s2"]);

        let none = registry.list(&tenant, &query(Some("missing"), 0, 10)).await.unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.total_count, 0);
    }

    #[tokio::test]
    async fn test_page_bounds() {
        let registry = registry();
        let tenant = TenantScope::new("org", "env");
        for i in 0..7 {
            registry.create(&tenant, &format!("k{}", i), "n").await.unwrap();
        }

        let page = registry.list(&tenant, &query(None, 1, 3)).await.unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].topic.key, "k3");
        assert_eq!(page.total_count, 7);
        assert_eq!((page.page, page.page_size), (1, 3));
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let registry = registry();
        let a = TenantScope::new("org-a", "env");
        let b = TenantScope::new("org-b", "env");
        registry.create(&a, "shared", "A").await.unwrap();
        registry.create(&b, "shared", "B").await.unwrap();

        let listed = registry.list(&a, &query(None, 0, 10)).await.unwrap();
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].topic.name, "A");
        assert_eq!(registry.get(&b, "shared").await.unwrap().topic.name, "B");
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let registry = registry();
        let tenant = TenantScope::new("org", "env");
        registry.create(&tenant, "news", "News").await.unwrap();

        assert!(matches!(
            registry.create(&tenant, "news", "Again").await,
            Err(PlatformError::Duplicate { .. })
        ));
        assert!(matches!(registry.get(&tenant, "nope").await, Err(PlatformError::NotFound { .. })));
        assert!(matches!(
            registry.rename(&tenant, "nope", "x").await,
            Err(PlatformError::NotFound { .. })
        ));

        let renamed = registry.rename(&tenant, "news", "Headlines").await.unwrap();
        assert_eq!(renamed.topic.key, "news");
        assert_eq!(renamed.topic.name, "Headlines");
    }

    /// Storage that ignores the tenant it is asked for
    struct LeakyRepository;

    #[async_trait]
    impl TopicRepository for LeakyRepository {
        async fn create_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Topic> {
            Ok(Topic::new(tenant.clone(), key, name))
        }
        async fn find_topic(&self, _tenant: &TenantScope, key: &str) -> Result<Option<Topic>> {
            Ok(Some(Topic::new(TenantScope::new("intruder", "env"), key, "leak")))
        }
        async fn find_topics(&self, _: &TenantScope, _: &TopicFilter, _: PageRequest) -> Result<TopicPage> {
            Ok(TopicPage {
                items: vec![Topic::new(TenantScope::new("intruder", "env"), "k", "leak")],
                total_count: 1,
            })
        }
        async fn rename_topic(&self, _: &TenantScope, _: &str, _: &str) -> Result<Option<Topic>> {
            Ok(None)
        }
        async fn upsert_membership(&self, _: &TenantScope, _: &str, _: &[String]) -> Result<()> {
            Ok(())
        }
        async fn remove_membership(&self, _: &TenantScope, _: &str, _: &[String]) -> Result<()> {
            Ok(())
        }
        async fn members_of(&self, _: &TenantScope, _: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_foreign_rows_are_an_isolation_violation() {
        let repo: Arc<dyn TopicRepository> = Arc::new(LeakyRepository);
        let registry = TopicRegistry::new(repo.clone(), SubscriptionLedger::new(repo));
        let tenant = TenantScope::new("org", "env");

        assert!(matches!(
            registry.list(&tenant, &query(None, 0, 10)).await,
            Err(PlatformError::TenantIsolation { .. })
        ));
        assert!(matches!(
            registry.get(&tenant, "k").await,
            Err(PlatformError::TenantIsolation { .. })
        ));
        assert!(matches!(
            registry.ledger.add_subscribers(&tenant, "k", vec!["s".into()]).await,
            Err(PlatformError::TenantIsolation { .. })
        ));
    }
}
