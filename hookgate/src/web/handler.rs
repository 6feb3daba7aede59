//! Handler hooks and the request/response types they exchange.
//!
//! A [`Handler`] is a record of optional async hooks, one per HTTP method.
//! Hooks that are not set answer `501 Method not supported`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{WebhookError, AUTH_FAILED_MESSAGE, METHOD_NOT_SUPPORTED_MESSAGE};
use crate::web::signature::SIGNATURE_HEADER;

/// An inbound request as seen by the authentication layer and hooks.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub headers: HeaderMap,
    /// Body exactly as received; signatures are computed over these bytes.
    pub raw_body: Bytes,
}

impl InboundRequest {
    pub fn new(method: Method, headers: HeaderMap, raw_body: Bytes) -> Self {
        Self {
            method,
            headers,
            raw_body,
        }
    }

    /// Value of the `X-Hub-Signature` header, if the client sent one.
    ///
    /// A header that is present but not valid visible ASCII yields an empty
    /// string, which never matches a computed signature.
    pub fn signature(&self) -> Option<&str> {
        self.headers
            .get(SIGNATURE_HEADER)
            .map(|v| v.to_str().unwrap_or(""))
    }

    /// Decode the body as JSON into `T`.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, WebhookError> {
        Ok(serde_json::from_slice(&self.raw_body)?)
    }
}

/// Status code plus JSON body produced by a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl HandlerResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` with the given body.
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Error response shaped as `{"status": <code>, "message": <message>}`.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(
            status,
            json!({ "status": status.as_u16(), "message": message }),
        )
    }

    pub fn method_not_supported() -> Self {
        Self::error(StatusCode::NOT_IMPLEMENTED, METHOD_NOT_SUPPORTED_MESSAGE)
    }

    pub fn auth_failed() -> Self {
        Self::error(StatusCode::UNAUTHORIZED, AUTH_FAILED_MESSAGE)
    }
}

impl From<WebhookError> for HandlerResponse {
    fn from(err: WebhookError) -> Self {
        Self::error(err.status_code(), err.public_message())
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Boxed future returned by a hook.
pub type HookFuture = BoxFuture<'static, HandlerResponse>;

/// A single hook.
pub type HookFn = Arc<dyn Fn(InboundRequest) -> HookFuture + Send + Sync>;

pub(crate) fn boxed_hook<F, Fut>(f: F) -> HookFn
where
    F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResponse> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

/// Optional GET/POST/PUT hooks.
#[derive(Clone, Default)]
pub struct Handler {
    on_get: Option<HookFn>,
    on_post: Option<HookFn>,
    on_put: Option<HookFn>,
}

impl Handler {
    /// A handler with no hooks; every method answers 501.
    pub fn new() -> Self {
        Self::default()
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

    pub fn on_put<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResponse> + Send + 'static,
    {
        self.on_put = Some(boxed_hook(f));
        self
    }

    pub async fn get(&self, req: InboundRequest) -> HandlerResponse {
        invoke(self.on_get.as_ref(), req).await
    }

    pub async fn post(&self, req: InboundRequest) -> HandlerResponse {
        invoke(self.on_post.as_ref(), req).await
    }

    pub async fn put(&self, req: InboundRequest) -> HandlerResponse {
        invoke(self.on_put.as_ref(), req).await
    }
}

async fn invoke(hook: Option<&HookFn>, req: InboundRequest) -> HandlerResponse {
    match hook {
        Some(hook) => hook(req).await,
        None => HandlerResponse::method_not_supported(),
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("on_get", &self.on_get.is_some())
            .field("on_post", &self.on_post.is_some())
            .field("on_put", &self.on_put.is_some())
            .finish()
    }
}
