//! Forwarding of verified webhook payloads to an upstream API.

use axum::http::StatusCode;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::client::ApiCaller;
use crate::web::{Handler, HandlerResponse, InboundRequest};

/// Handler whose POST hook decodes the payload and posts it to
/// `forward_path` on the upstream API.
///
/// Answers 200 once the upstream accepts the payload, 400 for a body that is
/// not JSON, and 502 when the upstream call fails or is refused.
pub fn forwarding_handler(api: ApiCaller, forward_path: String) -> Handler {
    Handler::new().on_post(move |req: InboundRequest| {
        let api = api.clone();
        let forward_path = forward_path.clone();
        async move { forward(&api, &forward_path, req).await }
    })
}

async fn forward(api: &ApiCaller, forward_path: &str, req: InboundRequest) -> HandlerResponse {
    let payload: Value = match req.parse_payload() {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, body_length = req.raw_body.len(), "relay_payload_malformed");
            return e.into();
        }
    };

    match api.post(forward_path, &payload).await {
        Ok(resp) if resp.is_success() => {
            info!(
                path = %forward_path,
                upstream_status = resp.status.as_u16(),
                "relay_forwarded"
            );
            HandlerResponse::ok(json!({ "status": 200, "message": "Forwarded" }))
        }
        Ok(resp) => {
            warn!(
                path = %forward_path,
                upstream_status = resp.status.as_u16(),
                "relay_upstream_refused"
            );
            HandlerResponse::error(StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
        Err(e) => {
            error!(path = %forward_path, error = %e, "relay_upstream_error");
            HandlerResponse::error(StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
    }
}
