//! Common API types and utilities

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PlatformError;

/// Error message body: a single sentence, or every violated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ErrorMessage {
    Single(String),
    Many(Vec<String>),
}

/// Standard API error response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub error: String,
    pub message: ErrorMessage,
}

impl ApiError {
    pub fn new(status: StatusCode, message: ErrorMessage) -> Self {
        Self {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        }
    }
}

/// Single-item envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated list envelope
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        Self {
            data,
            total_count,
            page,
            page_size,
        }
    }
}

/// Unwrap a JSON body, reporting malformed payloads as validation errors
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, PlatformError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| PlatformError::validation(vec![rejection.body_text()]))
}
