//! Hookgate - webhook receiver with HMAC and Basic authentication.
//!
//! ## Architecture
//!
//! ```text
//! Request → AuthPolicy (X-Hub-Signature) → Handler hook → (status, JSON body)
//!                                              ↓
//!                                         ApiCaller → upstream API
//! ```

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod relay;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use client::{ApiCaller, ApiError, ApiResponse};
pub use crate::config::{ApiConfig, Config, ConfigError};
pub use credential::Credential;
pub use error::WebhookError;
pub use web::{
    ApiServer, BasicAuthResource, Handler, HandlerResponse, HmacResource, InboundRequest,
    VerificationResult,
};
