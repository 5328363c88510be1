//! Errors from calls to peer services.

use std::time::Duration;

use stockgrid_core::ServiceError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{target}: could not build request: {reason}")]
    Request { target: String, reason: String },

    #[error("{target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    #[error("{target} timed out after {after:?}")]
    Timeout { target: String, after: Duration },

    /// The peer answered with a non-2xx status.
    #[error("{target} returned {status}: {body}")]
    Status {
        target: String,
        status: u16,
        body: String,
    },

    #[error("{target}: invalid response body: {reason}")]
    Decode { target: String, reason: String },
}

impl ClientError {
    pub fn target(&self) -> &str {
        match self {
            Self::Request { target, .. }
            | Self::Unreachable { target, .. }
            | Self::Timeout { target, .. }
            | Self::Status { target, .. }
            | Self::Decode { target, .. } => target,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Connection-level failure: the peer never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Request { .. } | Self::Unreachable { .. } | Self::Timeout { .. }
        )
    }

    /// Stock reported by a replica that rejected a conditional write.
    pub fn conflict_current(&self) -> Option<u64> {
        match self {
            Self::Status {
                status: 409, body, ..
            } => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("current_stock")?
                .as_u64(),
            _ => None,
        }
    }

    /// Relay the upstream's own error message when it sent a JSON body.
    fn upstream_message(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.to_string())
    }
}

impl From<ClientError> for ServiceError {
    /// 404 stays not-found, transport failures become unavailability
    /// naming the target, other statuses are relayed.
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Status {
                status: 404, body, ..
            } => ServiceError::NotFound(ClientError::upstream_message(&body)),
            ClientError::Status {
                target,
                status,
                body,
            } => ServiceError::Upstream {
                target,
                status,
                message: ClientError::upstream_message(&body),
            },
            ClientError::Decode { target, reason } => ServiceError::Upstream {
                target,
                status: 502,
                message: reason,
            },
            other => ServiceError::UpstreamUnavailable {
                target: other.target().to_string(),
                reason: other.to_string(),
            },
        }
    }
}
