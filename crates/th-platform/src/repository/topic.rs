//! MongoDB Topic Repository
//!
//! Topics live in `topics`; membership is one document per
//! (tenant, topic key, subscriber) in `topic_subscribers`, kept unique by
//! the indexes in `indexes.rs`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use th_common::TenantScope;

use super::{PageRequest, TopicFilter, TopicPage, TopicRepository};
use crate::domain::Topic;
use crate::error::{PlatformError, Result};

pub const TOPICS_COLLECTION: &str = "topics";
pub const TOPIC_SUBSCRIBERS_COLLECTION: &str = "topic_subscribers";

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TopicDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_organizationId")]
    organization_id: String,
    #[serde(rename = "_environmentId")]
    environment_id: String,
    key: String,
    name: String,
    #[serde(rename = "createdAt", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
}

impl From<&Topic> for TopicDocument {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id.clone(),
            organization_id: topic.tenant.organization_id.clone(),
            environment_id: topic.tenant.environment_id.clone(),
            key: topic.key.clone(),
            name: topic.name.clone(),
            created_at: topic.created_at,
        }
    }
}

impl From<TopicDocument> for Topic {
    fn from(d: TopicDocument) -> Self {
        Self {
            id: d.id,
            tenant: TenantScope::new(d.organization_id, d.environment_id),
            key: d.key,
            name: d.name,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TopicSubscriberDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_organizationId")]
    organization_id: String,
    #[serde(rename = "_environmentId")]
    environment_id: String,
    #[serde(rename = "topicKey")]
    topic_key: String,
    #[serde(rename = "externalSubscriberId")]
    external_subscriber_id: String,
}

pub struct MongoTopicRepository {
    topics: Collection<TopicDocument>,
    subscribers: Collection<TopicSubscriberDocument>,
}

impl MongoTopicRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            topics: db.collection(TOPICS_COLLECTION),
            subscribers: db.collection(TOPIC_SUBSCRIBERS_COLLECTION),
        }
    }
}

fn tenant_filter(tenant: &TenantScope) -> Document {
    doc! {
        "_organizationId": tenant.organization_id.as_str(),
        "_environmentId": tenant.environment_id.as_str(),
    }
}

fn topic_filter(tenant: &TenantScope, key: &str) -> Document {
    let mut filter = tenant_filter(tenant);
    filter.insert("key", key);
    filter
}

fn membership_filter(tenant: &TenantScope, key: &str) -> Document {
    let mut filter = tenant_filter(tenant);
    filter.insert("topicKey", key);
    filter
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn count_from(facet: &Document) -> u64 {
    let Ok(total) = facet.get_array("total") else {
        return 0;
    };
    match total.first() {
        Some(Bson::Document(d)) => match d.get("count") {
            Some(Bson::Int32(n)) => *n as u64,
            Some(Bson::Int64(n)) => *n as u64,
            _ => 0,
        },
        _ => 0,
    }
}

#[async_trait]
impl TopicRepository for MongoTopicRepository {
    async fn create_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Topic> {
        let topic = Topic::new(tenant.clone(), key, name);
        match self.topics.insert_one(TopicDocument::from(&topic)).await {
            Ok(_) => Ok(topic),
            Err(e) if is_duplicate_key(&e) => Err(PlatformError::duplicate("Topic", "key", key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_topic(&self, tenant: &TenantScope, key: &str) -> Result<Option<Topic>> {
        Ok(self.topics.find_one(topic_filter(tenant, key)).await?.map(Topic::from))
    }

    async fn find_topics(&self, tenant: &TenantScope, filter: &TopicFilter, page: PageRequest) -> Result<TopicPage> {
        let mut matcher = tenant_filter(tenant);
        if let Some(ref key) = filter.key {
            matcher.insert("key", key.as_str());
        }

        // Items and total come from a single aggregation so they agree
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let pipeline = vec![
            doc! { "$match": matcher },
            doc! { "$sort": { "createdAt": 1, "_id": 1 } },
            doc! {
                "$facet": {
                    "items": [ { "$skip": offset }, { "$limit": i64::from(page.page_size) } ],
                    "total": [ { "$count": "count" } ],
                }
            },
        ];

        let mut cursor = self.topics.aggregate(pipeline).await?;
        let Some(facet) = cursor.try_next().await? else {
            return Ok(TopicPage::default());
        };

        let mut items = Vec::new();
        if let Ok(docs) = facet.get_array("items") {
            for item in docs {
                if let Bson::Document(d) = item {
                    let document: TopicDocument = bson::from_document(d.clone())?;
                    items.push(Topic::from(document));
                }
            }
        }

        Ok(TopicPage {
            items,
            total_count: count_from(&facet),
        })
    }

    async fn rename_topic(&self, tenant: &TenantScope, key: &str, name: &str) -> Result<Option<Topic>> {
        let updated = self.topics
            .find_one_and_update(topic_filter(tenant, key), doc! { "$set": { "name": name } })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(Topic::from))
    }

    async fn upsert_membership(&self, tenant: &TenantScope, key: &str, subscribers: &[String]) -> Result<()> {
        // Per-element upserts are atomic; concurrent adds converge on the union
        for subscriber in subscribers {
            let mut filter = membership_filter(tenant, key);
            filter.insert("externalSubscriberId", subscriber.as_str());
            let update = doc! {
                "$setOnInsert": { "_id": uuid::Uuid::now_v7().to_string() }
            };

            match self.subscribers.update_one(filter, update).upsert(true).await {
                Ok(_) => {}
                // A concurrent upsert inserted the same member first
                Err(e) if is_duplicate_key(&e) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn remove_membership(&self, tenant: &TenantScope, key: &str, subscribers: &[String]) -> Result<()> {
        let mut filter = membership_filter(tenant, key);
        filter.insert("externalSubscriberId", doc! { "$in": subscribers });
        self.subscribers.delete_many(filter).await?;
        Ok(())
    }

    async fn members_of(&self, tenant: &TenantScope, key: &str) -> Result<Vec<String>> {
        let cursor = self.subscribers
            .find(membership_filter(tenant, key))
            .sort(doc! { "_id": 1 })
            .await?;
        let members: Vec<TopicSubscriberDocument> = cursor.try_collect().await?;
        Ok(members.into_iter().map(|m| m.external_subscriber_id).collect())
    }
}
