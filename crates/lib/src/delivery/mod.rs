//! Delivery primitive: the only place that talks to the messaging API.
//!
//! One logical send = a configuration check, payload validation, then up to
//! `max_attempts` HTTP attempts with exponential backoff. Callers see a single
//! success value or a single [`DeliveryError`]; retry details stay in here.

mod clock;
mod error;
mod retry;
mod transport;

pub use clock::{Sleeper, TokioSleeper};
pub use error::{parse_graph_error, DeliveryError, GraphApiError};
pub use retry::{Backoff, RetryPolicy, Step};
pub use transport::{messages_url, AttemptFailure, HttpTransport, Transport};

use crate::config::{self, Config};
use std::sync::Arc;
use std::time::Duration;

/// Retrying sender over a [`Transport`]. Stateless apart from its collaborators; cheap to clone.
#[derive(Clone)]
pub struct DeliveryClient {
    transport: Result<Arc<dyn Transport>, String>,
    sleeper: Arc<dyn Sleeper>,
}

impl DeliveryClient {
    pub fn new(transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            transport: Ok(transport),
            sleeper,
        }
    }

    /// A client whose every send fails with [`DeliveryError::Configuration`].
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            transport: Err(reason.into()),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Resolve credentials once and build the HTTP transport. Missing credentials do not fail
    /// here; they surface as a configuration error on the first send.
    pub fn from_config(config: &Config) -> Self {
        let credentials = match config::resolve_credentials(config) {
            Ok(c) => c,
            Err(missing) => {
                let reason = format!("missing {}", missing.join(", "));
                log::warn!("whatsapp delivery disabled: {}", reason);
                return Self::unconfigured(reason);
            }
        };
        let timeout = Duration::from_secs(config.delivery.request_timeout_secs);
        match HttpTransport::new(&config.whatsapp.api_base_url, &credentials, timeout) {
            Ok(t) => {
                log::debug!("whatsapp delivery endpoint: {}", t.url());
                Self::new(Arc::new(t), Arc::new(TokioSleeper))
            }
            Err(e) => Self::unconfigured(format!("building http client: {}", e)),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_ok()
    }

    /// Send one payload with retries. Returns the upstream response body of the successful attempt.
    pub async fn send(
        &self,
        payload: &serde_json::Value,
        policy: RetryPolicy,
    ) -> Result<serde_json::Value, DeliveryError> {
        let transport = self
            .transport
            .as_ref()
            .map_err(|reason| DeliveryError::configuration(reason.clone()))?;
        validate_payload(payload)?;

        let mut state = policy.start();
        loop {
            let failure = match transport.post(payload).await {
                Ok(body) => {
                    if state.attempt > 1 {
                        log::debug!("delivery succeeded on attempt {}", state.attempt);
                    }
                    return Ok(body);
                }
                Err(f) => f,
            };
            match state.after_failure(&policy) {
                Step::Retry { wait, next } => {
                    log::warn!(
                        "delivery attempt {} failed ({}); retrying in {}ms",
                        state.attempt,
                        failure,
                        wait.as_millis()
                    );
                    self.sleeper.sleep(wait).await;
                    state = next;
                }
                Step::GiveUp => return Err(exhausted(failure, state.attempt)),
            }
        }
    }
}

fn exhausted(failure: AttemptFailure, attempts: u32) -> DeliveryError {
    match failure {
        AttemptFailure::Status { status, body } => {
            let detail = parse_graph_error(&body);
            log::error!(
                "whatsapp api error after {} attempt(s): status {} body {}",
                attempts,
                status,
                body
            );
            DeliveryError::Api {
                status,
                body,
                detail,
                attempts,
            }
        }
        AttemptFailure::Network(message) => {
            log::error!(
                "whatsapp network error after {} attempt(s): {}",
                attempts,
                message
            );
            DeliveryError::Transport { message, attempts }
        }
    }
}

/// Preconditions checked before any network call. A payload is either a message
/// (`to` + `type`, and an `interactive` object when the type is interactive) or a read
/// receipt (`status: "read"` + `message_id`).
pub fn validate_payload(payload: &serde_json::Value) -> Result<(), DeliveryError> {
    let non_empty = |key: &str| {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    };
    if payload.get("status").and_then(|v| v.as_str()) == Some("read") {
        if non_empty("message_id") {
            return Ok(());
        }
        return Err(DeliveryError::validation("read receipt without message_id"));
    }
    if !non_empty("to") {
        return Err(DeliveryError::validation("payload has no recipient (to)"));
    }
    let typ = payload
        .get("type")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeliveryError::validation("payload has no type"))?;
    if typ == "interactive" && !payload.get("interactive").is_some_and(|v| v.is_object()) {
        return Err(DeliveryError::validation(
            "interactive payload without interactive body",
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport and recording sleeper shared by unit tests across the crate.

    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Pops one scripted outcome per attempt; once the script runs out every attempt succeeds.
    #[derive(Default)]
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<Result<serde_json::Value, AttemptFailure>>>,
        pub sent: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedTransport {
        pub fn new(script: Vec<Result<serde_json::Value, AttemptFailure>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn always_failing(status: u16, attempts: usize) -> Self {
            Self::new(
                (0..attempts)
                    .map(|_| {
                        Err(AttemptFailure::Status {
                            status,
                            body: r#"{"error":{"message":"upstream down","code":2}}"#.to_string(),
                        })
                    })
                    .collect(),
            )
        }

        pub fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post(
            &self,
            payload: &serde_json::Value,
        ) -> Result<serde_json::Value, AttemptFailure> {
            self.sent.lock().unwrap().push(payload.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(serde_json::json!({ "messages": [{ "id": "wamid.ok" }] })))
        }
    }

    /// Records requested waits without suspending.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }
}
