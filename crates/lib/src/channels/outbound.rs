//! Outbound seam between the dialogue dispatcher and a messaging platform.

use crate::channels::{Button, MediaType, OutboundMessage};
use crate::delivery::DeliveryError;
use async_trait::async_trait;

/// Sends one message per call. Implementations own formatting and retries;
/// callers see one outcome per logical send.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError>;

    async fn send_media(
        &self,
        to: &str,
        media_type: MediaType,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError>;

    async fn send_interactive_buttons(
        &self,
        to: &str,
        body_text: &str,
        buttons: &[Button],
        show_header: bool,
    ) -> Result<(), DeliveryError>;

    /// Best-effort read receipt. `None` is a no-op; failures are logged, never returned.
    async fn mark_as_read(&self, message_id: Option<&str>);

    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), DeliveryError> {
        match message {
            OutboundMessage::Text { body } => self.send_text(to, body).await,
            OutboundMessage::Media {
                media_type,
                url,
                caption,
            } => {
                self.send_media(to, *media_type, url, caption.as_deref())
                    .await
            }
            OutboundMessage::InteractiveButtons {
                body_text,
                buttons,
                show_header,
            } => {
                self.send_interactive_buttons(to, body_text, buttons, *show_header)
                    .await
            }
            OutboundMessage::ReadReceipt { message_id } => {
                self.mark_as_read(Some(message_id)).await;
                Ok(())
            }
        }
    }
}
