//! Configuration loading.
//!
//! Server settings come from environment variables. Upstream API settings
//! come from an INI file holding a JSON object under a section/key pair:
//!
//! ```ini
//! [UPSTREAM]
//! CONFIG = {"url": "https://api.example.com", "username": "bot", "password": "pw"}
//! ```

use std::env;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("{key} is not found under [{section}]")]
    Missing { section: String, key: String },

    #[error("{key} under [{section}] is not valid JSON for this setting: {source}")]
    Decode {
        section: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind
    pub host: String,

    /// Port for the web server to listen on
    pub port: u16,

    /// INI file holding the upstream API configuration
    pub api_config_file: PathBuf,

    /// Section of the upstream configuration (empty for top-level keys)
    pub api_config_section: String,

    /// Key of the upstream configuration within its section
    pub api_config_key: String,

    /// Route of the HMAC-authenticated webhook endpoint
    pub webhook_route: String,

    /// Route of the Basic-authenticated status endpoint
    pub status_route: String,

    /// Upstream path verified webhook payloads are forwarded to
    pub forward_path: String,

    /// Verify signatures on GET requests too
    pub require_signature_on_get: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            api_config_file: env::var("API_CONFIG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.ini")),

            api_config_section: env::var("API_CONFIG_SECTION")
                .unwrap_or_else(|_| "UPSTREAM".to_string()),

            api_config_key: env::var("API_CONFIG_KEY").unwrap_or_else(|_| "CONFIG".to_string()),

            webhook_route: env::var("WEBHOOK_ROUTE").unwrap_or_else(|_| "/webhook".to_string()),

            status_route: env::var("STATUS_ROUTE").unwrap_or_else(|_| "/status".to_string()),

            forward_path: env::var("FORWARD_PATH").unwrap_or_else(|_| "/events".to_string()),

            require_signature_on_get: parse_bool("REQUIRE_SIGNATURE_ON_GET", false),
        }
    }
}

/// Parse a boolean flag such as "true", "1", "yes" or "off".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Upstream API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub url: String,

    /// Username for the Basic `Authorization` header; no header when absent
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    /// Load from the JSON blob stored at `section`/`key` of an INI file.
    pub fn load(path: &Path, section: &str, key: &str) -> Result<Self, ConfigError> {
        load_json_setting(path, section, key)
    }
}

/// Read the JSON value stored at `section`/`key` of an INI file and
/// deserialize it into `T`.
///
/// Section and key names match case-insensitively. An empty section name
/// selects keys that appear before the first section header. Values are
/// taken verbatim: quotes and backslashes reach the JSON decoder untouched.
pub fn load_json_setting<T: DeserializeOwned>(
    path: &Path,
    section: &str,
    key: &str,
) -> Result<T, ConfigError> {
    let verbatim = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    let ini = Ini::load_from_file_opt(path, verbatim).map_err(|source| ConfigError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let raw = ini
        .iter()
        .filter(|(name, _)| name.unwrap_or("").eq_ignore_ascii_case(section))
        .flat_map(|(_, props)| props.iter())
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
        .ok_or_else(|| ConfigError::Missing {
            section: section.to_string(),
            key: key.to_string(),
        })?;

    serde_json::from_str(raw).map_err(|source| ConfigError::Decode {
        section: section.to_string(),
        key: key.to_string(),
        source,
    })
}
