use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::error::FieldErrors;
use crate::identity::RecordId;

/// Transport-level failure of one REST call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request did not complete (connection refused, timeout, broken body).
    #[error("Request failed: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        fields: FieldErrors,
    },

    /// A 2xx response whose body was not what the endpoint promises.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// REST collaborator for one resource collection.
///
/// Bodies are raw JSON; identity normalization happens in the controller, so
/// implementations never look at `id` vs `_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// `GET /api/<resource>`
    async fn list(&self) -> Result<Vec<Value>, ApiError>;

    /// `POST /api/<resource>`
    async fn create(&self, body: Value) -> Result<Value, ApiError>;

    /// `PUT /api/<resource>/:id`
    async fn update(&self, id: &RecordId, body: Value) -> Result<Value, ApiError>;

    /// `PATCH` on the resource's toggle route.
    async fn toggle(&self, id: &RecordId) -> Result<Value, ApiError>;

    /// `DELETE /api/<resource>/:id`
    async fn delete(&self, id: &RecordId) -> Result<(), ApiError>;
}
