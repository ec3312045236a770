//! Broker error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Where a recovered error sends the client next
pub const SIGNIN_REDIRECT: &str = "/signin";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed email or code shape; rejected before touching storage
    #[error("validation error: {0}")]
    Validation(String),

    /// No session where one is required, or session/user/email mismatch
    #[error("sign-in flow error")]
    Flow,

    /// The session's expiry has passed
    #[error("session expired")]
    Expired,

    /// Resend requested before the cooldown elapsed
    #[error("resend throttled, wait {wait_seconds}s")]
    Throttled { wait_seconds: i64 },

    /// Wrong code submitted too many times
    #[error("too many attempts")]
    AttemptsExceeded,

    /// Retry budget exhausted against the backend
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Email delivery failed during start or resend
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

impl AuthError {
    /// Whether this error invalidates the client's session reference
    ///
    /// These classes delete the server-side session (or find none), so the
    /// handler must clear the session cookie before responding.
    pub fn clears_session(&self) -> bool {
        matches!(
            self,
            AuthError::Flow
                | AuthError::Expired
                | AuthError::AttemptsExceeded
                | AuthError::Delivery(_)
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::Flow => (StatusCode::UNAUTHORIZED, "No sign-in in progress"),
            AuthError::Expired => (StatusCode::UNAUTHORIZED, "Sign-in session expired"),
            AuthError::Throttled { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Please wait before resending")
            }
            AuthError::AttemptsExceeded => (StatusCode::UNAUTHORIZED, "Too many attempts"),
            AuthError::Storage(err) => {
                tracing::error!("storage degraded beyond retry budget: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AuthError::Delivery(msg) => {
                tracing::warn!("email delivery failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "Could not send the code")
            }
        };

        let mut body = json!({ "success": false, "reason": message });
        if let AuthError::Throttled { wait_seconds } = &self {
            body["wait_seconds"] = json!(wait_seconds);
        }
        if matches!(
            self,
            AuthError::Flow | AuthError::Expired | AuthError::AttemptsExceeded
        ) {
            body["redirect"] = json!(SIGNIN_REDIRECT);
        }

        (status, axum::Json(body)).into_response()
    }
}
