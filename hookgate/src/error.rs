//! Error types shared by the authentication and dispatch layer.

use axum::http::StatusCode;
use thiserror::Error;

/// Message returned for every rejected request, whatever the cause.
pub const AUTH_FAILED_MESSAGE: &str = "Authorization failed";

/// Message returned by hooks that a resource does not provide.
pub const METHOD_NOT_SUPPORTED_MESSAGE: &str = "Method not supported";

/// Errors raised while authenticating or dispatching an inbound webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Authentication failed. The cause is deliberately not carried.
    #[error("authorization failed")]
    AuthRejected,

    /// The credential names a hash algorithm outside the supported set.
    #[error("unsupported hash algorithm '{algorithm}' (supported: {supported})")]
    UnsupportedAlgorithm { algorithm: String, supported: String },

    /// The request body could not be decoded into the handler's payload type.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The resource has no hook for this HTTP method.
    #[error("method not supported")]
    MethodNotSupported,
}

impl WebhookError {
    /// HTTP status the error maps to when surfaced to the remote caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Algorithm problems are a server-side misconfiguration but must look
            // exactly like any other rejection from the outside.
            WebhookError::AuthRejected | WebhookError::UnsupportedAlgorithm { .. } => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::MethodNotSupported => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Message safe to return to the remote caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            WebhookError::AuthRejected | WebhookError::UnsupportedAlgorithm { .. } => {
                AUTH_FAILED_MESSAGE
            }
            WebhookError::MalformedPayload(_) => "Malformed payload",
            WebhookError::MethodNotSupported => METHOD_NOT_SUPPORTED_MESSAGE,
        }
    }
}
