//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.nanbot/config.json`) and environment.
//! Credentials for the messaging API may come from either; environment wins.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// WhatsApp Cloud API credentials and endpoint.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Retry policy for outbound sends.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Dialogue pacing and content source.
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

/// Webhook server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the webhook HTTP server (default 3000).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    3000
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Bearer token. Overridden by WHATSAPP_API_TOKEN env when set.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Business phone number id used in the send URL. Overridden by WHATSAPP_PHONE_NUMBER_ID.
    #[serde(default)]
    pub phone_number_id: Option<String>,
    /// Graph API version segment, e.g. "v21.0". Overridden by WHATSAPP_API_VERSION.
    #[serde(default)]
    pub api_version: Option<String>,
    /// Scheme + host of the Graph API (default "https://graph.facebook.com").
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Token expected on GET webhook verification. Overridden by WHATSAPP_VERIFY_TOKEN.
    #[serde(default)]
    pub verify_token: Option<String>,
    /// Header shown on interactive messages. When unset the catalog header is used.
    #[serde(default)]
    pub header_text: Option<String>,
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            phone_number_id: None,
            api_version: None,
            api_base_url: default_api_base_url(),
            verify_token: None,
            header_text: None,
        }
    }
}

/// Retry settings for the delivery primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfig {
    /// Attempts per logical send, including the first (default 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay for ordinary sends, doubled after each failure (default 1000).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// First backoff delay for read receipts (default 500).
    #[serde(default = "default_read_receipt_delay_ms")]
    pub read_receipt_delay_ms: u64,
    /// Per-request socket timeout (default 10).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_read_receipt_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            read_receipt_delay_ms: default_read_receipt_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Dialogue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueConfig {
    /// Insert the catalog's pauses between sends of a multi-step screen (default true).
    #[serde(default = "default_pacing")]
    pub pacing: bool,
    /// Content catalog JSON. Relative paths are resolved against the config file's parent.
    /// Omit to use the bundled catalog.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

fn default_pacing() -> bool {
    true
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            pacing: default_pacing(),
            catalog_path: None,
        }
    }
}

/// Credentials required before any outbound call can be attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub phone_number_id: String,
    pub api_version: String,
}

/// Env value (trimmed, non-empty) or the config fallback (trimmed, non-empty).
fn env_or(var: &str, fallback: Option<&String>) -> Option<String> {
    std::env::var(var)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            fallback
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the API token: env WHATSAPP_API_TOKEN overrides config.
pub fn resolve_api_token(config: &Config) -> Option<String> {
    env_or("WHATSAPP_API_TOKEN", config.whatsapp.api_token.as_ref())
}

/// Resolve the sender phone number id: env WHATSAPP_PHONE_NUMBER_ID overrides config.
pub fn resolve_phone_number_id(config: &Config) -> Option<String> {
    env_or(
        "WHATSAPP_PHONE_NUMBER_ID",
        config.whatsapp.phone_number_id.as_ref(),
    )
}

/// Resolve the Graph API version: env WHATSAPP_API_VERSION overrides config.
pub fn resolve_api_version(config: &Config) -> Option<String> {
    env_or("WHATSAPP_API_VERSION", config.whatsapp.api_version.as_ref())
}

/// Resolve the webhook verify token: env WHATSAPP_VERIFY_TOKEN overrides config.
pub fn resolve_verify_token(config: &Config) -> Option<String> {
    env_or("WHATSAPP_VERIFY_TOKEN", config.whatsapp.verify_token.as_ref())
}

/// Resolve all three credentials at once. On failure returns the names of the missing settings.
pub fn resolve_credentials(config: &Config) -> Result<Credentials, Vec<&'static str>> {
    credentials_from(
        resolve_api_token(config),
        resolve_phone_number_id(config),
        resolve_api_version(config),
    )
}

fn credentials_from(
    api_token: Option<String>,
    phone_number_id: Option<String>,
    api_version: Option<String>,
) -> Result<Credentials, Vec<&'static str>> {
    match (api_token, phone_number_id, api_version) {
        (Some(api_token), Some(phone_number_id), Some(api_version)) => Ok(Credentials {
            api_token,
            phone_number_id,
            api_version,
        }),
        (t, p, v) => {
            let mut missing = Vec::new();
            if t.is_none() {
                missing.push("apiToken");
            }
            if p.is_none() {
                missing.push("phoneNumberId");
            }
            if v.is_none() {
                missing.push("apiVersion");
            }
            Err(missing)
        }
    }
}

/// True if the bind address is loopback (127.0.0.1, ::1, etc.).
pub fn is_loopback_bind(bind: &str) -> bool {
    let b = bind.trim();
    b == "127.0.0.1" || b == "::1" || b == "localhost"
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("NANBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".nanbot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Resolve the catalog path, if one is configured. Relative paths are resolved against the config file's parent.
pub fn resolve_catalog_path(config: &Config, config_path: &std::path::Path) -> Option<PathBuf> {
    let configured = config.dialogue.catalog_path.as_ref()?;
    if configured.as_os_str().is_empty() {
        return None;
    }
    if configured.is_absolute() {
        Some(configured.clone())
    } else {
        let parent = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        Some(parent.join(configured))
    }
}

/// Load config from the default path (or NANBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
