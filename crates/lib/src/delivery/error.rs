//! Delivery error taxonomy.

use serde::Deserialize;

/// Error detail returned by the Graph API in a non-2xx body:
/// `{ "error": { "message", "type", "code", "fbtrace_id" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphApiError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub typ: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphApiErrorEnvelope {
    error: GraphApiError,
}

/// Parse the Graph API error envelope out of a response body, if it is one.
pub fn parse_graph_error(body: &str) -> Option<GraphApiError> {
    serde_json::from_str::<GraphApiErrorEnvelope>(body)
        .ok()
        .map(|e| e.error)
}

/// Failure of one logical send. Validation and configuration errors are raised before any
/// network call and are never retried; `Api` and `Transport` are raised once retries are exhausted.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Caller input does not form a valid request.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Credentials or endpoint settings are missing.
    #[error("messaging api not configured: {0}")]
    Configuration(String),

    /// Upstream answered with a non-2xx status on the final attempt.
    #[error("messaging api rejected request after {attempts} attempt(s): {status} {body}")]
    Api {
        status: u16,
        body: String,
        detail: Option<GraphApiError>,
        attempts: u32,
    },

    /// Upstream could not be reached on the final attempt (connect error, timeout, reset).
    #[error("messaging api unreachable after {attempts} attempt(s): {message}")]
    Transport { message: String, attempts: u32 },
}

impl DeliveryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Number of network attempts made before giving up; zero for local errors.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Api { attempts, .. } | Self::Transport { attempts, .. } => *attempts,
            Self::Validation(_) | Self::Configuration(_) => 0,
        }
    }

    /// HTTP status of the final failed attempt, if the upstream answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
