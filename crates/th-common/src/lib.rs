use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use utoipa::ToSchema;

pub mod logging;

// ============================================================================
// Tenant Scope
// ============================================================================

/// The isolation boundary for all topic and membership data.
///
/// Every read and write takes one explicitly; nothing is resolved from
/// ambient request state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantScope {
    pub organization_id: String,
    pub environment_id: String,
}

impl TenantScope {
    pub fn new(organization_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            environment_id: environment_id.into(),
        }
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization_id, self.environment_id)
    }
}

// ============================================================================
// Job Topics
// ============================================================================

/// Logical job destinations shared between producers and workers.
///
/// Renaming or removing a variant breaks every worker bound to it; only
/// additions are compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobTopicName {
    ActiveJobsMetric,
    CompletedJobsMetric,
    InboundParseMail,
    Standard,
    WebSockets,
    Workflow,
}

impl JobTopicName {
    pub const ALL: [JobTopicName; 6] = [
        JobTopicName::ActiveJobsMetric,
        JobTopicName::CompletedJobsMetric,
        JobTopicName::InboundParseMail,
        JobTopicName::Standard,
        JobTopicName::WebSockets,
        JobTopicName::Workflow,
    ];

    /// Physical queue identifier the job is published to
    pub fn queue_name(self) -> &'static str {
        match self {
            JobTopicName::ActiveJobsMetric => "metric-active-jobs",
            JobTopicName::CompletedJobsMetric => "metric-completed-jobs",
            JobTopicName::InboundParseMail => "inbound-parse-mail",
            JobTopicName::Standard => "standard",
            JobTopicName::WebSockets => "ws_socket_queue",
            JobTopicName::Workflow => "trigger-handler",
        }
    }

    /// Background transaction tag, only defined for queues processed by workers
    pub fn observability_tag(self) -> Option<ObservabilityTransactionTag> {
        match self {
            JobTopicName::Standard => Some(ObservabilityTransactionTag::JobProcessingQueue),
            JobTopicName::Workflow => Some(ObservabilityTransactionTag::TriggerHandlerQueue),
            JobTopicName::WebSockets => Some(ObservabilityTransactionTag::WsSocketQueue),
            JobTopicName::ActiveJobsMetric
            | JobTopicName::CompletedJobsMetric
            | JobTopicName::InboundParseMail => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobTopicName::ActiveJobsMetric => "ACTIVE_JOBS_METRIC",
            JobTopicName::CompletedJobsMetric => "COMPLETED_JOBS_METRIC",
            JobTopicName::InboundParseMail => "INBOUND_PARSE_MAIL",
            JobTopicName::Standard => "STANDARD",
            JobTopicName::WebSockets => "WEB_SOCKETS",
            JobTopicName::Workflow => "WORKFLOW",
        }
    }
}

impl fmt::Display for JobTopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label attached to dispatched jobs for tracing/metrics grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservabilityTransactionTag {
    JobProcessingQueue,
    TriggerHandlerQueue,
    WsSocketQueue,
}

impl ObservabilityTransactionTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ObservabilityTransactionTag::JobProcessingQueue => "job-processing-queue",
            ObservabilityTransactionTag::TriggerHandlerQueue => "trigger-handler-queue",
            ObservabilityTransactionTag::WsSocketQueue => "ws_socket_queue",
        }
    }
}

impl fmt::Display for ObservabilityTransactionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Jobs & Queue Messages
// ============================================================================

/// A unit of asynchronous work as handed to the router by a producer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_topic_name: JobTopicName,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantScope>,
}

impl Job {
    pub fn new(job_topic_name: JobTopicName, payload: serde_json::Value) -> Self {
        Self {
            job_topic_name,
            payload,
            tenant: None,
        }
    }

    pub fn with_tenant(mut self, tenant: TenantScope) -> Self {
        self.tenant = Some(tenant);
        self
    }
}

/// The envelope that travels through the broker.
///
/// Built once by the router and never modified afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub id: String,
    pub queue: String,
    pub job_topic_name: JobTopicName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability_tag: Option<ObservabilityTransactionTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantScope>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl QueueMessage {
    pub fn from_job(job: Job) -> Self {
        let name = job.job_topic_name;
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            queue: name.queue_name().to_string(),
            job_topic_name: name,
            observability_tag: name.observability_tag(),
            tenant: job.tenant,
            payload: job.payload,
            created_at: Utc::now(),
        }
    }
}
