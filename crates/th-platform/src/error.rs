//! Platform Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use th_common::TenantScope;
use th_router::DispatchError;

use crate::api::common::{ApiError, ErrorMessage};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{entity_type} with key {key} not found")]
    NotFound { entity_type: String, key: String },

    #[error("{entity_type} with {field} {value} already exists")]
    Duplicate { entity_type: String, field: String, value: String },

    /// Every violated rule, in the order the rules were checked
    #[error("Validation failed: {}", messages.join(", "))]
    Validation { messages: Vec<String> },

    #[error("Page size can not be larger then {max}")]
    PageSizeTooLarge { max: u32 },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A read returned data belonging to another tenant. Never caused by input.
    #[error("Tenant isolation violated: expected {expected}, found {found}")]
    TenantIsolation { expected: TenantScope, found: TenantScope },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(messages: Vec<String>) -> Self {
        Self::Validation { messages }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PlatformError::NotFound { .. } => StatusCode::NOT_FOUND,
            PlatformError::Duplicate { .. } => StatusCode::CONFLICT,
            PlatformError::Validation { .. } | PlatformError::PageSizeTooLarge { .. } => StatusCode::BAD_REQUEST,
            PlatformError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            PlatformError::Dispatch(_) => StatusCode::SERVICE_UNAVAILABLE,
            PlatformError::TenantIsolation { .. }
            | PlatformError::Database(_)
            | PlatformError::Deserialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            PlatformError::Validation { messages } => ErrorMessage::Many(messages),
            ref e if status.is_server_error() && !matches!(e, PlatformError::Dispatch(_)) => {
                error!(error = %e, "Request failed");
                ErrorMessage::Single("Internal server error".to_string())
            }
            e => ErrorMessage::Single(e.to_string()),
        };

        (status, Json(ApiError::new(status, message))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PlatformError::not_found("Topic", "k").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(PlatformError::duplicate("Topic", "key", "k").status_code(), StatusCode::CONFLICT);
        assert_eq!(PlatformError::PageSizeTooLarge { max: 10 }.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PlatformError::TenantIsolation {
                expected: TenantScope::new("a", "b"),
                found: TenantScope::new("c", "d"),
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_page_size_message() {
        assert_eq!(
            PlatformError::PageSizeTooLarge { max: 10 }.to_string(),
            "Page size can not be larger then 10"
        );
    }
}
