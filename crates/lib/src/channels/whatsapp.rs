//! WhatsApp Cloud API channel: builds message payloads and hands them to the delivery primitive.

use crate::channels::message::MAX_BUTTONS;
use crate::channels::{Button, MediaType, Outbound};
use crate::config::Config;
use crate::delivery::{DeliveryClient, DeliveryError, RetryPolicy};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const DEFAULT_HEADER_TEXT: &str = "🚚 ÑanBot | Asistente de Mudanzas";

/// Message gateway for one business phone number. Stateless apart from its delivery client.
#[derive(Clone)]
pub struct WhatsAppChannel {
    delivery: DeliveryClient,
    header_text: String,
    send_policy: RetryPolicy,
    read_policy: RetryPolicy,
}

impl WhatsAppChannel {
    pub fn new(delivery: DeliveryClient, header_text: impl Into<String>) -> Self {
        Self {
            delivery,
            header_text: header_text.into(),
            send_policy: RetryPolicy::send_default(),
            read_policy: RetryPolicy::read_receipt_default(),
        }
    }

    /// Build from config: credentials, timeout and retry policies. `header_text` applies
    /// unless the config overrides it.
    pub fn from_config(config: &Config, header_text: &str) -> Self {
        let header = config
            .whatsapp
            .header_text
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(header_text);
        Self::new(DeliveryClient::from_config(config), header).with_policies(
            RetryPolicy::send_from_config(&config.delivery),
            RetryPolicy::read_receipt_from_config(&config.delivery),
        )
    }

    pub fn with_policies(mut self, send: RetryPolicy, read: RetryPolicy) -> Self {
        self.send_policy = send;
        self.read_policy = read;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.delivery.is_configured()
    }

    async fn deliver(&self, payload: Value) -> Result<Value, DeliveryError> {
        self.delivery.send(&payload, self.send_policy).await
    }
}

fn require(value: &str, what: &str) -> Result<(), DeliveryError> {
    if value.trim().is_empty() {
        Err(DeliveryError::validation(format!("{} is required", what)))
    } else {
        Ok(())
    }
}

pub fn text_payload(to: &str, body: &str) -> Result<Value, DeliveryError> {
    require(to, "recipient")?;
    require(body, "text body")?;
    Ok(json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "text",
        "text": { "body": body, "preview_url": false }
    }))
}

pub fn media_payload(
    to: &str,
    media_type: MediaType,
    url: &str,
    caption: Option<&str>,
) -> Result<Value, DeliveryError> {
    require(to, "recipient")?;
    require(url, "media url")?;
    let mut payload = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": media_type.as_str(),
    });
    payload[media_type.as_str()] = json!({
        "link": url,
        "caption": caption.unwrap_or(""),
    });
    Ok(payload)
}

/// Interactive reply-button payload. Buttons are normalized and anything past the third is dropped.
pub fn interactive_payload(
    to: &str,
    body_text: &str,
    buttons: &[Button],
    header: Option<&str>,
) -> Result<Value, DeliveryError> {
    require(to, "recipient")?;
    require(body_text, "button body text")?;
    if buttons.is_empty() {
        return Err(DeliveryError::validation("at least one button is required"));
    }
    if buttons.len() > MAX_BUTTONS {
        log::debug!(
            "dropping {} button(s) beyond the platform limit of {}",
            buttons.len() - MAX_BUTTONS,
            MAX_BUTTONS
        );
    }
    let mut formatted = Vec::with_capacity(MAX_BUTTONS);
    for b in buttons.iter().take(MAX_BUTTONS) {
        let b = b.normalized();
        if b.id.is_empty() || b.title.trim().is_empty() {
            return Err(DeliveryError::validation(
                "button id and title must not be empty after normalization",
            ));
        }
        formatted.push(json!({
            "type": "reply",
            "reply": { "id": b.id, "title": b.title }
        }));
    }
    let mut interactive = json!({
        "type": "button",
        "body": { "text": body_text },
        "action": { "buttons": formatted }
    });
    if let Some(text) = header.filter(|h| !h.trim().is_empty()) {
        interactive["header"] = json!({ "type": "text", "text": text });
    }
    Ok(json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to,
        "type": "interactive",
        "interactive": interactive
    }))
}

pub fn read_receipt_payload(message_id: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "status": "read",
        "message_id": message_id
    })
}

#[async_trait]
impl Outbound for WhatsAppChannel {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let payload = text_payload(to, body)?;
        self.deliver(payload).await.map(|_| ()).map_err(|e| {
            log::warn!("sending text to {} failed: {}", to, e);
            e
        })
    }

    async fn send_media(
        &self,
        to: &str,
        media_type: MediaType,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let payload = media_payload(to, media_type, url, caption)?;
        log::debug!("sending {} to {}: {}", media_type, to, url);
        self.deliver(payload).await.map(|_| ()).map_err(|e| {
            log::warn!("sending {} to {} failed ({}): {}", media_type, to, url, e);
            e
        })
    }

    async fn send_interactive_buttons(
        &self,
        to: &str,
        body_text: &str,
        buttons: &[Button],
        show_header: bool,
    ) -> Result<(), DeliveryError> {
        let header = show_header.then_some(self.header_text.as_str());
        let payload = interactive_payload(to, body_text, buttons, header)?;
        self.deliver(payload).await.map(|_| ()).map_err(|e| {
            log::warn!("sending interactive buttons to {} failed: {}", to, e);
            e
        })
    }

    async fn mark_as_read(&self, message_id: Option<&str>) {
        let Some(id) = message_id.filter(|s| !s.trim().is_empty()) else {
            log::debug!("no message id to mark as read");
            return;
        };
        match self
            .delivery
            .send(&read_receipt_payload(id), self.read_policy)
            .await
        {
            Ok(_) => log::debug!("marked message {} as read", id),
            Err(e) => log::warn!("failed to mark message {} as read: {}", id, e),
        }
    }
}
