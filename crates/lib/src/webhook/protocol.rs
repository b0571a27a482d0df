//! Webhook wire types and validation at the door.

use crate::channels::InboundEvent;
use serde::Deserialize;

/// Event name that carries an inbound message.
pub const MESSAGE_CREATED: &str = "message_created";

/// A validated webhook POST body.
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    pub event: String,
    /// Present when `event` is [`MESSAGE_CREATED`].
    pub message: Option<InboundEvent>,
}

/// Query of the subscription verification GET.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Parse and check a POST body. The error is the human-readable reason returned as `details`.
pub fn parse_envelope(body: &[u8]) -> Result<WebhookEnvelope, String> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err("No request body".to_string());
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("Malformed JSON body: {}", e))?;
    let Some(obj) = value.as_object() else {
        return Err("No request body".to_string());
    };
    let event = obj
        .get("event")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "No event type specified".to_string())?
        .to_string();

    let message = match obj.get("message").filter(|m| !m.is_null()) {
        Some(m) if event == MESSAGE_CREATED => Some(
            serde_json::from_value::<InboundEvent>(m.clone())
                .map_err(|e| format!("Malformed message data: {}", e))?,
        ),
        None if event == MESSAGE_CREATED => {
            return Err("Message event without message data".to_string())
        }
        _ => None,
    };
    Ok(WebhookEnvelope { event, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::EventKind;

    #[test]
    fn message_event_is_parsed() {
        let body = br#"{"event":"message_created","message":{"id":"m1","from":"+51900000000","type":"text","text":{"body":"Hola"}}}"#;
        let env = parse_envelope(body).unwrap();
        assert_eq!(env.event, MESSAGE_CREATED);
        let msg = env.message.unwrap();
        assert_eq!(msg.kind(), EventKind::Text(Some("Hola")));
    }

    #[test]
    fn door_rejections_name_the_problem() {
        assert_eq!(parse_envelope(b"").unwrap_err(), "No request body");
        assert_eq!(parse_envelope(b"[]").unwrap_err(), "No request body");
        assert_eq!(
            parse_envelope(br#"{"message":{}}"#).unwrap_err(),
            "No event type specified"
        );
        assert_eq!(
            parse_envelope(br#"{"event":"message_created"}"#).unwrap_err(),
            "Message event without message data"
        );
        assert!(parse_envelope(b"{oops").unwrap_err().starts_with("Malformed JSON"));
        assert!(parse_envelope(br#"{"event":"message_created","message":"hi"}"#)
            .unwrap_err()
            .starts_with("Malformed message"));
    }

    #[test]
    fn other_events_need_no_message() {
        let env = parse_envelope(br#"{"event":"conversation_status_changed"}"#).unwrap();
        assert!(env.message.is_none());
        let env = parse_envelope(
            br#"{"event":"message_updated","message":{"from":"1","type":"text"}}"#,
        )
        .unwrap();
        assert!(env.message.is_none());
    }
}
