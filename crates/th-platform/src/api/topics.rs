//! Topics API
//!
//! REST endpoints for topics, their subscribers and topic triggers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use th_router::JobTopicRouter;
use utoipa::{IntoParams, ToSchema};

use crate::api::common::{json_body, ApiError, DataResponse, PaginatedResponse};
use crate::api::middleware::Tenant;
use crate::domain::{SubscriberMutation, Topic, TopicWithSubscribers};
use crate::error::PlatformError;
use crate::repository::TopicRepository;
use crate::service::{SubscriptionLedger, TopicRegistry, TopicTriggerService};
use crate::validation::{
    validate_create_topic, validate_subscribers, validate_topic_name, QueryValidator, RawTopicQuery,
};

/// Create topic request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTopicRequest {
    /// Unique within the tenant; immutable after creation
    #[serde(default)]
    pub key: String,

    /// Display name
    #[serde(default)]
    pub name: String,
}

/// Rename topic request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameTopicRequest {
    #[serde(default)]
    pub name: String,
}

/// Add or remove subscribers request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribersRequest {
    /// External subscriber ids
    #[serde(default)]
    pub subscribers: Vec<String>,
}

/// Trigger a workflow for every subscriber of a topic
#[derive(Debug, Deserialize, ToSchema)]
pub struct TriggerTopicRequest {
    /// Workflow identifier
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

/// Topic response DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct TopicResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_organizationId")]
    pub organization_id: String,
    #[serde(rename = "_environmentId")]
    pub environment_id: String,
    pub key: String,
    pub name: String,
    pub subscribers: Vec<String>,
}

impl From<TopicWithSubscribers> for TopicResponse {
    fn from(t: TopicWithSubscribers) -> Self {
        Self {
            id: t.topic.id,
            organization_id: t.topic.tenant.organization_id,
            environment_id: t.topic.tenant.environment_id,
            key: t.topic.key,
            name: t.topic.name,
            subscribers: t.subscribers,
        }
    }
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        TopicWithSubscribers { topic, subscribers: Vec::new() }.into()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscribersResponse {
    pub succeeded: Vec<String>,
}

impl From<SubscriberMutation> for SubscribersResponse {
    fn from(m: SubscriberMutation) -> Self {
        Self { succeeded: m.succeeded }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub acknowledged: bool,
    pub job_id: String,
    pub queue: String,
    pub transaction_tag: Option<String>,
}

/// Query parameters for topics list. Documentation only: the handler reads
/// the raw pairs so malformed values can be reported rule by rule.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TopicsQuery {
    /// Exact topic key
    pub key: Option<String>,
    /// Zero-based page number
    pub page: Option<u32>,
    /// Items per page (1-10)
    pub page_size: Option<u32>,
}

/// Topics service state
#[derive(Clone)]
pub struct TopicsState {
    pub registry: TopicRegistry,
    pub ledger: SubscriptionLedger,
    pub trigger: TopicTriggerService,
    pub validator: QueryValidator,
}

impl TopicsState {
    /// Wire the services over one repository and one router
    pub fn new(repo: Arc<dyn TopicRepository>, router: Arc<JobTopicRouter>, validator: QueryValidator) -> Self {
        let ledger = SubscriptionLedger::new(repo.clone());
        let registry = TopicRegistry::new(repo, ledger.clone());
        let trigger = TopicTriggerService::new(registry.clone(), router);
        Self {
            registry,
            ledger,
            trigger,
            validator,
        }
    }
}

/// Create a topic
#[utoipa::path(
    post,
    path = "/v1/topics",
    tag = "topics",
    request_body = CreateTopicRequest,
    responses(
        (status = 201, description = "Topic created", body = DataResponse<TopicResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 409, description = "Duplicate topic key", body = ApiError)
    )
)]
pub async fn create_topic(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    body: Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<TopicResponse>>), PlatformError> {
    let req = json_body(body)?;
    validate_create_topic(&req.key, &req.name)?;

    let topic = state.registry.create(&tenant, &req.key, &req.name).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(topic.into()))))
}

/// List topics
#[utoipa::path(
    get,
    path = "/v1/topics",
    tag = "topics",
    params(TopicsQuery),
    responses(
        (status = 200, description = "Page of topics", body = PaginatedResponse<TopicResponse>),
        (status = 400, description = "Invalid pagination or filter", body = ApiError)
    )
)]
pub async fn list_topics(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<PaginatedResponse<TopicResponse>>, PlatformError> {
    let query = state.validator.validate(&RawTopicQuery::from_pairs(pairs))?;
    let listing = state.registry.list(&tenant, &query).await?;

    Ok(Json(PaginatedResponse::new(
        listing.items.into_iter().map(TopicResponse::from).collect(),
        listing.total_count,
        listing.page,
        listing.page_size,
    )))
}

/// Get a topic by key
#[utoipa::path(
    get,
    path = "/v1/topics/{key}",
    tag = "topics",
    params(("key" = String, Path, description = "Topic key")),
    responses(
        (status = 200, description = "Topic found", body = DataResponse<TopicResponse>),
        (status = 404, description = "Topic not found", body = ApiError)
    )
)]
pub async fn get_topic(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    Path(key): Path<String>,
) -> Result<Json<DataResponse<TopicResponse>>, PlatformError> {
    let topic = state.registry.get(&tenant, &key).await?;
    Ok(Json(DataResponse::new(topic.into())))
}

/// Rename a topic
#[utoipa::path(
    patch,
    path = "/v1/topics/{key}",
    tag = "topics",
    params(("key" = String, Path, description = "Topic key")),
    request_body = RenameTopicRequest,
    responses(
        (status = 200, description = "Topic renamed", body = DataResponse<TopicResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Topic not found", body = ApiError)
    )
)]
pub async fn rename_topic(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    Path(key): Path<String>,
    body: Result<Json<RenameTopicRequest>, JsonRejection>,
) -> Result<Json<DataResponse<TopicResponse>>, PlatformError> {
    let req = json_body(body)?;
    validate_topic_name(&req.name)?;

    let topic = state.registry.rename(&tenant, &key, &req.name).await?;
    Ok(Json(DataResponse::new(topic.into())))
}

/// Add subscribers to a topic
#[utoipa::path(
    post,
    path = "/v1/topics/{key}/subscribers",
    tag = "topics",
    params(("key" = String, Path, description = "Topic key")),
    request_body = SubscribersRequest,
    responses(
        (status = 200, description = "Subscribers added", body = DataResponse<SubscribersResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Topic not found", body = ApiError)
    )
)]
pub async fn add_subscribers(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    Path(key): Path<String>,
    body: Result<Json<SubscribersRequest>, JsonRejection>,
) -> Result<Json<DataResponse<SubscribersResponse>>, PlatformError> {
    let req = json_body(body)?;
    validate_subscribers(&req.subscribers)?;

    let result = state.ledger.add_subscribers(&tenant, &key, req.subscribers).await?;
    Ok(Json(DataResponse::new(result.into())))
}

/// Remove subscribers from a topic
#[utoipa::path(
    post,
    path = "/v1/topics/{key}/subscribers/removal",
    tag = "topics",
    params(("key" = String, Path, description = "Topic key")),
    request_body = SubscribersRequest,
    responses(
        (status = 200, description = "Subscribers removed", body = DataResponse<SubscribersResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Topic not found", body = ApiError)
    )
)]
pub async fn remove_subscribers(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    Path(key): Path<String>,
    body: Result<Json<SubscribersRequest>, JsonRejection>,
) -> Result<Json<DataResponse<SubscribersResponse>>, PlatformError> {
    let req = json_body(body)?;
    validate_subscribers(&req.subscribers)?;

    let result = state.ledger.remove_subscribers(&tenant, &key, req.subscribers).await?;
    Ok(Json(DataResponse::new(result.into())))
}

/// Trigger a workflow for a topic's subscribers
#[utoipa::path(
    post,
    path = "/v1/topics/{key}/trigger",
    tag = "topics",
    params(("key" = String, Path, description = "Topic key")),
    request_body = TriggerTopicRequest,
    responses(
        (status = 201, description = "Workflow job enqueued", body = DataResponse<TriggerResponse>),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Topic not found", body = ApiError),
        (status = 503, description = "Queue broker unavailable", body = ApiError)
    )
)]
pub async fn trigger_topic(
    State(state): State<TopicsState>,
    Tenant(tenant): Tenant,
    Path(key): Path<String>,
    body: Result<Json<TriggerTopicRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<TriggerResponse>>), PlatformError> {
    let req = json_body(body)?;
    validate_topic_name(&req.name)?;

    let handle = state.trigger.trigger(&tenant, &key, &req.name, req.payload).await?;
    let response = TriggerResponse {
        acknowledged: true,
        job_id: handle.job_id,
        queue: handle.queue.to_string(),
        transaction_tag: handle.observability_tag.map(|t| t.as_str().to_string()),
    };
    Ok((StatusCode::CREATED, Json(DataResponse::new(response))))
}

/// Create topics router
pub fn topics_router(state: TopicsState) -> Router {
    Router::new()
        .route("/v1/topics", post(create_topic).get(list_topics))
        .route("/v1/topics/:key", get(get_topic).patch(rename_topic))
        .route("/v1/topics/:key/subscribers", post(add_subscribers))
        .route("/v1/topics/:key/subscribers/removal", post(remove_subscribers))
        .route("/v1/topics/:key/trigger", post(trigger_topic))
        .with_state(state)
}
