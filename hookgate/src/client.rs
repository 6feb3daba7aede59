//! Outbound REST client for upstream services.
//!
//! Every call targets `<base url><path>`, sends a Basic `Authorization`
//! header when the configuration carries a username, and decodes the
//! response body as JSON (an empty body decodes to `{}`).

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ApiConfig;

/// Errors from the outbound client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decoded upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Client bound to one upstream base URL.
#[derive(Clone)]
pub struct ApiCaller {
    client: Client,
    base_url: String,
    auth_header: Option<String>,
}

impl ApiCaller {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        Url::parse(&config.url)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth_header: basic_auth_header(config),
        })
    }

    /// Full URL for a path relative to the base URL.
    pub fn construct_url(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Value sent in the `Authorization` header, if any.
    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        self.call(Method::GET, path, Some(params), None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.call(Method::POST, path, None, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.call(Method::PUT, path, None, body).await
    }

    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<ApiResponse, ApiError> {
        self.call(Method::DELETE, path, None, body).await
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        params: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.construct_url(path);
        info!(method = %method, url = %url, "api_call_starting");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            request = request.query(params);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(auth) = &self.auth_header {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(method = %method, url = %url, error = %e, "api_call_timeout");
            } else {
                warn!(method = %method, url = %url, error = %e, "api_call_error");
            }
            ApiError::Request(e)
        })?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            json!({})
        } else {
            serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
                url: url.clone(),
                source,
            })?
        };

        debug!(
            method = %method,
            url = %url,
            status_code = status.as_u16(),
            response_length = bytes.len(),
            "api_call_complete"
        );

        Ok(ApiResponse { status, body })
    }
}

impl std::fmt::Debug for ApiCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCaller")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_header.is_some())
            .finish()
    }
}

fn basic_auth_header(config: &ApiConfig) -> Option<String> {
    let username = config.username.as_deref().filter(|u| !u.is_empty())?;
    let password = config.password.as_deref().unwrap_or_default();
    let token = STANDARD.encode(format!("{}:{}", username, password));
    Some(format!("Basic {}", token))
}
