//! Error taxonomy shared by all StockGrid services.
//!
//! Each variant maps to a fixed HTTP status. Handlers return
//! `ServiceResult<T>` and let [`IntoResponse`] render the error body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::ItemId;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed id or stock. Caller error, never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Business rule, not a fault.
    #[error("item {0} is out of stock")]
    OutOfStock(ItemId),

    /// A conditional write lost against a concurrent writer.
    #[error("stock for item {item_id} changed concurrently (now {current})")]
    Conflict { item_id: ItemId, current: u64 },

    #[error("storage error: {0}")]
    Storage(String),

    /// A peer could not be reached or timed out.
    #[error("upstream {target} unavailable: {reason}")]
    UpstreamUnavailable { target: String, reason: String },

    /// A peer answered with a status we relay, or failed on a path where
    /// the contract asks for 500.
    #[error("upstream {target} failed with {status}: {message}")]
    Upstream {
        target: String,
        status: u16,
        message: String,
    },
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::OutOfStock(_) | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Short machine-readable name, included in the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::OutOfStock(_) => "out_of_stock",
            Self::Conflict { .. } => "conflict",
            Self::Storage(_) => "storage_error",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Upstream { .. } => "upstream_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if let Self::Conflict { current, .. } = &self {
            body["current_stock"] = serde_json::json!(current);
        }
        (self.status(), Json(body)).into_response()
    }
}
