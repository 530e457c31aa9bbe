//! Topic Entity
//!
//! A tenant-scoped named group of subscribers. The key is unique within a
//! tenant and never changes after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use th_common::TenantScope;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub tenant: TenantScope,
    pub key: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Topic {
    /// Ids are time-ordered so sorting by id gives insertion order
    pub fn new(tenant: TenantScope, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            tenant,
            key: key.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn belongs_to(&self, tenant: &TenantScope) -> bool {
        &self.tenant == tenant
    }
}

/// A topic hydrated with its current membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicWithSubscribers {
    pub topic: Topic,
    pub subscribers: Vec<String>,
}

/// Outcome of a bulk membership mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberMutation {
    pub succeeded: Vec<String>,
}
