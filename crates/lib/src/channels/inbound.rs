//! Inbound message event as delivered by the webhook: classified before dispatch.

use crate::channels::MediaType;
use serde::{Deserialize, Serialize};

/// One message from a sender. Only `from` is required for the event to be handled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Platform message id, used for the read receipt.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractiveContent {
    #[serde(default)]
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ButtonReply {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// What kind of turn an event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<'a> {
    Text(Option<&'a str>),
    ButtonReply(Option<&'a str>),
    Media(MediaType),
    Other(&'a str),
}

impl InboundEvent {
    pub fn text(id: Option<&str>, from: &str, body: &str) -> Self {
        Self {
            id: id.map(str::to_string),
            from: Some(from.to_string()),
            typ: "text".to_string(),
            text: Some(TextContent {
                body: Some(body.to_string()),
            }),
            interactive: None,
        }
    }

    pub fn button(id: Option<&str>, from: &str, button_id: &str) -> Self {
        Self {
            id: id.map(str::to_string),
            from: Some(from.to_string()),
            typ: "interactive".to_string(),
            text: None,
            interactive: Some(InteractiveContent {
                button_reply: Some(ButtonReply {
                    id: Some(button_id.to_string()),
                    title: None,
                }),
            }),
        }
    }

    /// Sender id, if present and non-blank.
    pub fn sender(&self) -> Option<&str> {
        self.from
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Message id for the read receipt, if present and non-blank.
    pub fn message_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn kind(&self) -> EventKind<'_> {
        match self.typ.as_str() {
            "text" => EventKind::Text(self.text.as_ref().and_then(|t| t.body.as_deref())),
            "interactive" => EventKind::ButtonReply(
                self.interactive
                    .as_ref()
                    .and_then(|i| i.button_reply.as_ref())
                    .and_then(|b| b.id.as_deref()),
            ),
            other => match MediaType::parse(other) {
                Some(media) => EventKind::Media(media),
                None => EventKind::Other(other),
            },
        }
    }
}
