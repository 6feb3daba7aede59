//! Hookgate server - receives signed webhooks and relays them upstream.

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hookgate::relay::forwarding_handler;
use hookgate::{
    ApiCaller, ApiConfig, ApiServer, BasicAuthResource, Config, Credential, HandlerResponse,
    HmacResource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env();
    info!(
        host = %config.host,
        port = config.port,
        api_config_file = %config.api_config_file.display(),
        webhook_route = %config.webhook_route,
        status_route = %config.status_route,
        require_signature_on_get = config.require_signature_on_get,
        "config_loaded"
    );

    // Without upstream configuration there is nowhere to relay to; refuse to serve.
    let api_config = match ApiConfig::load(
        &config.api_config_file,
        &config.api_config_section,
        &config.api_config_key,
    ) {
        Ok(api_config) => api_config,
        Err(e) => {
            error!(error = %e, "api_config_setup_failed");
            return Err(e).context("Configuration setup failed");
        }
    };
    let api_caller = ApiCaller::new(&api_config).context("Failed to create API client")?;
    info!(client = ?api_caller, "api_client_created");

    let webhook_credential = Credential::from_env("WEBHOOK");
    info!(
        hmac_configured = webhook_credential.hmac_key().is_some(),
        hmac_algorithm = %webhook_credential.hmac_algorithm(),
        "webhook_credential_loaded"
    );

    let status_credential = Credential::from_env("STATUS");
    if status_credential.username().is_empty() {
        warn!("status_credential_not_configured");
    }

    let webhook = HmacResource::new(
        webhook_credential,
        forwarding_handler(api_caller, config.forward_path.clone()),
    )
    .require_signature_on_get(config.require_signature_on_get);

    let status = BasicAuthResource::new(status_credential)
        .on_get(|_req| async { HandlerResponse::ok(json!({ "status": "ok" })) });

    ApiServer::new()
        .add_hmac_resource(&config.webhook_route, webhook)
        .add_basic_resource(&config.status_route, status)
        .start(&config.host, config.port)
        .await
}
