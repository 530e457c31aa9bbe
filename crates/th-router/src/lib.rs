//! Job Topic Router
//!
//! Routes asynchronous work onto physical queues:
//! - JobTopicRouter: resolves queue + observability tag and publishes through the broker
//! - RouterConfig: acknowledgement timeout for broker publishes
//! - DispatchError: broker rejection or timeout, surfaced to the producer

pub mod error;
pub mod router;

pub use error::DispatchError;
pub use router::{JobHandle, JobRoute, JobTopicRouter, RouterConfig};

pub type Result<T> = std::result::Result<T, DispatchError>;
