use std::time::Duration;

use http::StatusCode;
use serde_json::Value;

/// The `detail` the API sends when a request carried no usable credentials.
/// Only this reason is recoverable by refreshing.
pub const CREDENTIALS_NOT_PROVIDED: &str = "Authentication credentials were not provided.";

/// Everything that can go wrong talking to the remote API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}")]
    Status { status: StatusCode, body: Value },
    /// No response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// A body could not be encoded, or did not have the expected shape.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no response after {0:?}")]
    Timeout(Duration),
    /// An interceptor took ownership of the failure (for instance by
    /// redirecting to sign-in); the caller has nothing left to handle.
    #[error("request was handled by an interceptor")]
    Intercepted,
}

/// How an authentication failure can be dealt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Credentials were missing; a refresh may recover them.
    Refreshable,
    /// Credentials were present but rejected.
    Terminal,
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The response body, when the server sent one.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Classify a 401. Anything else is not an authentication failure.
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        let ApiError::Status { status, body } = self else {
            return None;
        };
        if *status != StatusCode::UNAUTHORIZED {
            return None;
        }
        match body.get("detail").and_then(Value::as_str) {
            Some(CREDENTIALS_NOT_PROVIDED) => Some(AuthFailure::Refreshable),
            _ => Some(AuthFailure::Terminal),
        }
    }
}
