//! Route table and HTTP serving.
//!
//! Use [`ApiServer::add_hmac_resource`] for endpoints authenticated with a
//! shared HMAC secret and [`ApiServer::add_basic_resource`] for endpoints
//! behind HTTP Basic authentication.

use std::future::{self, Future};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    http::{HeaderMap, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::web::basic_auth::BasicAuthResource;
use crate::web::handler::InboundRequest;
use crate::web::hmac_resource::HmacResource;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Builder for the server's routes.
#[derive(Debug)]
pub struct ApiServer {
    router: Router,
}

impl Default for ApiServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiServer {
    /// A server exposing only `GET /health`.
    pub fn new() -> Self {
        Self {
            router: Router::new().route("/health", get(health)),
        }
    }

    /// Mount an HMAC-authenticated resource on `route` for GET, POST and PUT.
    pub fn add_hmac_resource(mut self, route: &str, resource: HmacResource) -> Self {
        let resource = Arc::new(resource);
        let on_get = resource.clone();
        let on_post = resource.clone();
        let on_put = resource;

        let methods = get(move |method: Method, headers: HeaderMap, body: Bytes| {
            let resource = on_get.clone();
            async move { resource.get(InboundRequest::new(method, headers, body)).await }
        })
        .post(move |method: Method, headers: HeaderMap, body: Bytes| {
            let resource = on_post.clone();
            async move { resource.post(InboundRequest::new(method, headers, body)).await }
        })
        .put(move |method: Method, headers: HeaderMap, body: Bytes| {
            let resource = on_put.clone();
            async move { resource.put(InboundRequest::new(method, headers, body)).await }
        });

        info!(route = %route, "hmac_resource_mounted");
        self.router = self.router.route(route, methods);
        self
    }

    /// Mount a Basic-authenticated resource on `route` for GET and POST.
    pub fn add_basic_resource(mut self, route: &str, resource: BasicAuthResource) -> Self {
        let resource = Arc::new(resource);
        let on_get = resource.clone();
        let on_post = resource;

        let methods = get(move |method: Method, headers: HeaderMap, body: Bytes| {
            let resource = on_get.clone();
            async move { resource.get(InboundRequest::new(method, headers, body)).await }
        })
        .post(move |method: Method, headers: HeaderMap, body: Bytes| {
            let resource = on_post.clone();
            async move { resource.post(InboundRequest::new(method, headers, body)).await }
        });

        info!(route = %route, "basic_resource_mounted");
        self.router = self.router.route(route, methods);
        self
    }

    /// The finished router, with HTTP request tracing.
    pub fn into_router(self) -> Router {
        self.router.layer(TraceLayer::new_for_http())
    }

    /// Bind `host:port` and serve until SIGINT or SIGTERM.
    pub async fn start(self, host: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind to {}:{}", host, port))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until SIGINT or SIGTERM.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests and return.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = listener.local_addr().context("Failed to read local address")?;
        info!(address = %address, "web_server_listening");

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("web_server_shutting_down");
            })
            .await
            .context("Server error")?;

        info!("web_server_shutdown_complete");
        Ok(())
    }
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires, so
/// the server keeps running on the remaining one.
async fn shutdown_signal() {
    let interrupt = async {
        match signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!(error = %e, signal = "SIGINT", "signal_handler_unavailable");
                future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                error!(error = %e, signal = "SIGTERM", "signal_handler_unavailable");
                future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<&'static str>();

    let received = tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    };
    info!(signal = received, "shutdown_signal_received");
}
