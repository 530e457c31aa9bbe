//! OpenAPI Documentation

use utoipa::OpenApi;

/// Platform API OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TopicHub Platform API",
        version = "1.0.0",
        description = "Topic registry, subscriber membership and topic-triggered workflows"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "topics", description = "Topics and their subscribers")
    ),
    paths(
        super::topics::create_topic,
        super::topics::list_topics,
        super::topics::get_topic,
        super::topics::rename_topic,
        super::topics::add_subscribers,
        super::topics::remove_subscribers,
        super::topics::trigger_topic,
    ),
    components(schemas(
        super::common::ApiError,
        super::common::ErrorMessage,
        super::topics::CreateTopicRequest,
        super::topics::RenameTopicRequest,
        super::topics::SubscribersRequest,
        super::topics::TriggerTopicRequest,
        super::topics::TopicResponse,
        super::topics::SubscribersResponse,
        super::topics::TriggerResponse,
    ))
)]
pub struct PlatformApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_topic_paths() {
        let doc = PlatformApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/v1/topics"));
        assert!(paths.iter().any(|p| p.as_str() == "/v1/topics/{key}/trigger"));
    }
}
