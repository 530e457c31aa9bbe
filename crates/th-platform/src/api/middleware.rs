//! API Middleware
//!
//! Tenant extraction for Axum handlers. Authentication happens upstream;
//! the gateway forwards the resolved tenant in request headers.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use th_common::TenantScope;

use crate::error::PlatformError;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const ENVIRONMENT_HEADER: &str = "x-environment-id";

/// Extractor for the tenant a request acts on
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantScope);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, PlatformError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PlatformError::unauthorized(format!("Missing {} header", name)))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let organization_id = header(parts, ORGANIZATION_HEADER)?;
        let environment_id = header(parts, ENVIRONMENT_HEADER)?;
        Ok(Tenant(TenantScope::new(organization_id, environment_id)))
    }
}
