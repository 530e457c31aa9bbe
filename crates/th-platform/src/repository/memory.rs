//! In-memory Topic Repository
//!
//! Single lock over topics and memberships: writes are atomic and each read
//! sees one consistent snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexSet;
use parking_lot::RwLock;
use th_common::TenantScope;

use super::{PageRequest, TopicFilter, TopicPage, TopicRepository};
use crate::domain::Topic;
use crate::error::{PlatformError, Result};

type TopicKey = (TenantScope, String);

#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion order
    topics: Vec<Topic>,
    by_key: HashMap<TopicKey, usize>,
    members: HashMap<TopicKey, IndexSet<String>>,
}

#[derive(Debug, Default)]
pub struct InMemoryTopicRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryTopicRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn scoped(tenant: &TenantScope, key: &str) -> TopicKey {
    (tenant.clone(), key.to_string())
}

#[async_trait]
impl TopicRepository for InMemoryTopicRepository {
    async fn create_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Topic> {
        let mut state = self.state.write();
        let scoped_key = scoped(tenant, key);
        if state.by_key.contains_key(&scoped_key) {
            return Err(PlatformError::duplicate("Topic", "key", key));
        }

        let topic = Topic::new(tenant.clone(), key, name);
        let index = state.topics.len();
        state.topics.push(topic.clone());
        state.by_key.insert(scoped_key, index);
        Ok(topic)
    }

    async fn find_topic(&self, tenant: &TenantScope, key: &str) -> Result<Option<Topic>> {
        let state = self.state.read();
        Ok(state
            .by_key
            .get(&scoped(tenant, key))
            .map(|&index| state.topics[index].clone()))
    }

    async fn find_topics(&self, tenant: &TenantScope, filter: &TopicFilter, page: PageRequest) -> Result<TopicPage> {
        let state = self.state.read();
        let matching: Vec<&Topic> = state
            .topics
            .iter()
            .filter(|t| t.belongs_to(tenant))
            .filter(|t| filter.key.as_deref().map_or(true, |key| t.key == key))
            .collect();

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .iter()
            .skip(offset)
            .take(page.page_size as usize)
            .map(|t| (*t).clone())
            .collect();

        Ok(TopicPage {
            items,
            total_count: matching.len() as u64,
        })
    }

    async fn rename_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Option<Topic>> {
        let mut state = self.state.write();
        let Some(&index) = state.by_key.get(&scoped(tenant, key)) else {
            return Ok(None);
        };
        let topic = &mut state.topics[index];
        topic.name = name.to_string();
        Ok(Some(topic.clone()))
    }

    async fn upsert_membership(&self, tenant: &TenantScope, key: &str, subscribers: &[String]) -> Result<()> {
        let mut state = self.state.write();
        let set = state.members.entry(scoped(tenant, key)).or_default();
        set.extend(subscribers.iter().cloned());
        Ok(())
    }

    async fn remove_membership(&self, tenant: &TenantScope, key: &str, subscribers: &[String]) -> Result<()> {
        let mut state = self.state.write();
        if let Some(set) = state.members.get_mut(&scoped(tenant, key)) {
            for subscriber in subscribers {
                set.shift_remove(subscriber);
            }
        }
        Ok(())
    }

    async fn members_of(&self, tenant: &TenantScope, key: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        Ok(state
            .members
            .get(&scoped(tenant, key))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(org: &str) -> TenantScope {
        TenantScope::new(org, "env")
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected_per_tenant() {
        let repo = InMemoryTopicRepository::new();
        repo.create_topic(&tenant("a"), "news", "News").await.unwrap();

        let err = repo.create_topic(&tenant("a"), "news", "Other").await.unwrap_err();
        assert!(matches!(err, PlatformError::Duplicate { .. }));

        // Same key in another tenant is fine
        repo.create_topic(&tenant("b"), "news", "News").await.unwrap();
    }

    #[tokio::test]
    async fn test_find_topics_pages_in_insertion_order() {
        let repo = InMemoryTopicRepository::new();
        for key in ["k1", "k3", "k2", "k5", "k4"] {
            repo.create_topic(&tenant("a"), key, key).await.unwrap();
        }
        repo.create_topic(&tenant("b"), "k9", "k9").await.unwrap();

        let first = repo
            .find_topics(&tenant("a"), &TopicFilter::default(), PageRequest::new(0, 2))
            .await
            .unwrap();
        let keys: Vec<&str> = first.items.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k3"]);
        assert_eq!(first.total_count, 5);

        let last = repo
            .find_topics(&tenant("a"), &TopicFilter::default(), PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].key, "k4");
        assert_eq!(last.total_count, 5);

        let beyond = repo
            .find_topics(&tenant("a"), &TopicFilter::default(), PageRequest::new(u32::MAX, 10))
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 5);
    }

    #[tokio::test]
    async fn test_membership_is_a_set_in_join_order() {
        let repo = InMemoryTopicRepository::new();
        let t = tenant("a");
        repo.upsert_membership(&t, "news", &ids(&["s2", "s1", "s2"])).await.unwrap();
        repo.upsert_membership(&t, "news", &ids(&["s1", "s3"])).await.unwrap();

        assert_eq!(repo.members_of(&t, "news").await.unwrap(), vec!["s2", "s1", "s3"]);

        repo.remove_membership(&t, "news", &ids(&["s1", "missing"])).await.unwrap();
        assert_eq!(repo.members_of(&t, "news").await.unwrap(), vec!["s2", "s3"]);
        assert!(repo.members_of(&tenant("b"), "news").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_keeps_key() {
        let repo = InMemoryTopicRepository::new();
        let t = tenant("a");
        repo.create_topic(&t, "news", "News").await.unwrap();

        let renamed = repo.rename_topic(&t, "news", "Headlines").await.unwrap().unwrap();
        assert_eq!(renamed.key, "news");
        assert_eq!(renamed.name, "Headlines");
        assert!(repo.rename_topic(&tenant("b"), "news", "x").await.unwrap().is_none());
    }
}
