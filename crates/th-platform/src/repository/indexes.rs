//! MongoDB index bootstrap
//!
//! The unique indexes are what turn concurrent duplicate creates and
//! concurrent membership upserts into a single winner.

use mongodb::{bson::doc, options::IndexOptions, Database, IndexModel};
use tracing::info;

use super::topic::{TOPICS_COLLECTION, TOPIC_SUBSCRIBERS_COLLECTION};
use crate::error::Result;

/// Create the indexes the topic repository relies on. Safe to call on every startup.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let topics = db.collection::<mongodb::bson::Document>(TOPICS_COLLECTION);
    topics
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "_organizationId": 1, "_environmentId": 1, "key": 1 })
                .options(IndexOptions::builder().name("uniq_tenant_key".to_string()).unique(true).build())
                .build(),
            // Listing sorts by creation time within a tenant
            IndexModel::builder()
                .keys(doc! { "_organizationId": 1, "_environmentId": 1, "createdAt": 1, "_id": 1 })
                .options(IndexOptions::builder().name("idx_tenant_created".to_string()).build())
                .build(),
        ])
        .await?;
    info!("Created indexes on {} collection", TOPICS_COLLECTION);

    let subscribers = db.collection::<mongodb::bson::Document>(TOPIC_SUBSCRIBERS_COLLECTION);
    subscribers
        .create_index(
            IndexModel::builder()
                .keys(doc! {
                    "_organizationId": 1,
                    "_environmentId": 1,
                    "topicKey": 1,
                    "externalSubscriberId": 1,
                })
                .options(IndexOptions::builder().name("uniq_tenant_topic_subscriber".to_string()).unique(true).build())
                .build(),
        )
        .await?;
    info!("Created indexes on {} collection", TOPIC_SUBSCRIBERS_COLLECTION);

    Ok(())
}
