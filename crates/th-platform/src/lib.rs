//! TopicHub Platform
//!
//! Core platform providing:
//! - Tenant-scoped topics with unique keys
//! - Idempotent subscriber membership
//! - Validated, paginated topic listing
//! - Topic-triggered workflow dispatch through the job router

pub mod api;
pub mod domain;
pub mod error;
pub mod repository;
pub mod service;
pub mod validation;

pub use domain::*;
pub use error::PlatformError;
