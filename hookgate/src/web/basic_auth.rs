//! Resource guarded by HTTP Basic authentication.

use std::fmt;
use std::future::Future;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tracing::{info_span, warn, Instrument, Span};

use crate::credential::Credential;
use crate::web::handler::{boxed_hook, HandlerResponse, HookFn, InboundRequest};
use crate::web::signature::constant_time_compare;

/// Realm advertised in the `WWW-Authenticate` challenge.
pub const BASIC_REALM: &str = "Authentication Required";

/// Rejection returned when Basic credentials are missing or wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(
                header::WWW_AUTHENTICATE,
                format!("Basic realm=\"{}\"", BASIC_REALM),
            )],
            Json(json!({ "status": 401, "message": "Unauthorized Access" })),
        )
            .into_response()
    }
}

/// A route whose hooks only run after the caller presents the configured
/// username and password.
pub struct BasicAuthResource {
    credential: Credential,
    on_get: Option<HookFn>,
    on_post: Option<HookFn>,
    span: Span,
}

impl BasicAuthResource {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            on_get: None,
            on_post: None,
            span: info_span!("basic_auth_resource"),
        }
    }

    pub fn on_get<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResponse> + Send + 'static,
    {
        self.on_get = Some(boxed_hook(f));
        self
    }

    pub fn on_post<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResponse> + Send + 'static,
    {
        self.on_post = Some(boxed_hook(f));
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Exact match against the configured username and password.
    ///
    /// Empty usernames or passwords never pass, even if configured that way.
    pub fn verify_password(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }
        let user_ok = constant_time_compare(username, self.credential.username());
        let pass_ok = constant_time_compare(password, self.credential.password());
        user_ok & pass_ok
    }

    pub async fn get(&self, req: InboundRequest) -> Result<HandlerResponse, Unauthorized> {
        self.authenticate(&req.headers)?;
        Ok(run(self.on_get.as_ref(), req).instrument(self.span.clone()).await)
    }

    pub async fn post(&self, req: InboundRequest) -> Result<HandlerResponse, Unauthorized> {
        self.authenticate(&req.headers)?;
        Ok(run(self.on_post.as_ref(), req).instrument(self.span.clone()).await)
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<(), Unauthorized> {
        let _entered = self.span.enter();
        match basic_credentials(headers) {
            Some((username, password)) if self.verify_password(&username, &password) => Ok(()),
            Some((username, _)) => {
                warn!(username = %username, "basic_auth_invalid");
                Err(Unauthorized)
            }
            None => {
                warn!("basic_auth_missing");
                Err(Unauthorized)
            }
        }
    }
}

// Unset hooks are no-ops.
async fn run(hook: Option<&HookFn>, req: InboundRequest) -> HandlerResponse {
    match hook {
        Some(hook) => hook(req).await,
        None => HandlerResponse::ok(Value::Null),
    }
}

/// Extract `(username, password)` from an `Authorization: Basic ...` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

impl fmt::Debug for BasicAuthResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthResource")
            .field("credential", &self.credential)
            .field("on_get", &self.on_get.is_some())
            .field("on_post", &self.on_post.is_some())
            .finish()
    }
}
