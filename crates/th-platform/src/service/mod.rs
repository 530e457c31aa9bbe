//! Service Layer
//!
//! Topic registry, subscription ledger and topic-triggered dispatch.

pub mod subscription_ledger;
pub mod topic_registry;
pub mod topic_trigger;

use th_common::TenantScope;
use tracing::error;

use crate::domain::Topic;
use crate::error::{PlatformError, Result};

pub use subscription_ledger::SubscriptionLedger;
pub use topic_registry::{TopicListing, TopicRegistry};
pub use topic_trigger::TopicTriggerService;

/// Reject any topic the storage layer handed back for the wrong tenant
pub(crate) fn ensure_tenant(expected: &TenantScope, topic: &Topic) -> Result<()> {
    if topic.belongs_to(expected) {
        return Ok(());
    }
    error!(
        expected = %expected,
        found = %topic.tenant,
        topic_id = %topic.id,
        "Storage returned a topic outside the requesting tenant"
    );
    Err(PlatformError::TenantIsolation {
        expected: expected.clone(),
        found: topic.tenant.clone(),
    })
}
