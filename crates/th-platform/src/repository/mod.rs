//! Repository Layer
//!
//! Storage interface for topics and their membership, with an in-memory
//! implementation for development/tests and a MongoDB implementation.

pub mod indexes;
pub mod memory;
pub mod topic;

use async_trait::async_trait;
use th_common::TenantScope;

use crate::domain::Topic;
use crate::error::Result;

pub use indexes::ensure_indexes;
pub use memory::InMemoryTopicRepository;
pub use topic::MongoTopicRepository;

/// Recognised topic filters; anything else a caller sends is dropped earlier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicFilter {
    /// Exact key match
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }
}

/// One page of topics plus the size of the whole filtered set, both read
/// from the same snapshot
#[derive(Debug, Clone, Default)]
pub struct TopicPage {
    pub items: Vec<Topic>,
    pub total_count: u64,
}

/// Storage collaborator for topics and memberships.
///
/// Every method is scoped by `tenant`; implementations must never return
/// rows belonging to another tenant.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Persist a new topic and assign its id. Fails with `Duplicate` when the
    /// tenant already has a topic with this key.
    async fn create_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Topic>;

    async fn find_topic(&self, tenant: &TenantScope, key: &str) -> Result<Option<Topic>>;

    /// Topics in insertion order
    async fn find_topics(&self, tenant: &TenantScope, filter: &TopicFilter, page: PageRequest) -> Result<TopicPage>;

    async fn rename_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Option<Topic>>;

    /// Add each subscriber to the topic's set. Adding a present member is a no-op.
    async fn upsert_membership(&self, tenant: &TenantScope, key: &str, subscribers: &[String]) -> Result<()>;

    /// Remove each subscriber from the topic's set. Removing an absent member is a no-op.
    async fn remove_membership(&self, tenant: &TenantScope, key: &str, subscribers: &[String]) -> Result<()>;

    /// Members in the order they first joined
    async fn members_of(&self, tenant: &TenantScope, key: &str) -> Result<Vec<String>>;
}
