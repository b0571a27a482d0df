//! Outbound message model and platform constraints on reply buttons.

use serde::{Deserialize, Serialize};

/// Longest button id the platform accepts.
pub const BUTTON_ID_MAX_CHARS: usize = 256;
/// Longest button title the platform accepts.
pub const BUTTON_TITLE_MAX_CHARS: usize = 20;
/// Most reply buttons one interactive message may carry.
pub const MAX_BUTTONS: usize = 3;

/// Media kinds the gateway can send by link, and the inbound types acknowledged as files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Document,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Option<MediaType> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            "document" => Some(MediaType::Document),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reply button: `id` comes back in the sender's `button_reply`, `title` is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Clamp to platform limits: id cut to 256 chars then stripped to `[A-Za-z0-9_]`,
    /// title cut to 20 chars. Idempotent.
    pub fn normalized(&self) -> Button {
        let id = self
            .id
            .chars()
            .take(BUTTON_ID_MAX_CHARS)
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let title = self.title.chars().take(BUTTON_TITLE_MAX_CHARS).collect();
        Button { id, title }
    }
}

/// Everything the gateway knows how to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        body: String,
    },
    Media {
        media_type: MediaType,
        url: String,
        caption: Option<String>,
    },
    InteractiveButtons {
        body_text: String,
        buttons: Vec<Button>,
        show_header: bool,
    },
    ReadReceipt {
        message_id: String,
    },
}
