//! API Layer
//!
//! REST API endpoints for the platform.

pub mod common;
pub mod middleware;
pub mod openapi;
pub mod topics;

pub use common::*;
pub use middleware::Tenant;
pub use openapi::PlatformApiDoc;
pub use topics::{topics_router, TopicsState};
