//! Inbound webhook authentication and dispatch.
//!
//! - `signature`: `X-Hub-Signature` computation and constant-time checks
//! - `policy`: decides whether a signed request may reach its handler
//! - `handler`: per-method hook records and response types
//! - `hmac_resource` / `basic_auth`: the two kinds of authenticated routes
//! - `server`: mounts resources on an axum router and serves it

pub mod basic_auth;
pub mod handler;
pub mod hmac_resource;
pub mod policy;
pub mod server;
pub mod signature;

pub use basic_auth::{BasicAuthResource, Unauthorized};
pub use handler::{Handler, HandlerResponse, HookFn, InboundRequest};
pub use hmac_resource::HmacResource;
pub use policy::{authorize, VerificationResult};
pub use server::{health, ApiServer, HealthResponse};
pub use signature::{compute_signature, constant_time_compare, verify_signature, SIGNATURE_HEADER};
