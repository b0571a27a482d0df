//! Messaging channels.
//!
//! Inbound events arrive through the webhook; outbound messages go through an
//! [`Outbound`] implementation, of which [`WhatsAppChannel`] is the only one.

mod inbound;
pub mod message;
mod outbound;
mod whatsapp;

pub use inbound::{ButtonReply, EventKind, InboundEvent, InteractiveContent, TextContent};
pub use message::{Button, MediaType, OutboundMessage};
pub use outbound::Outbound;
pub use whatsapp::{
    interactive_payload, media_payload, read_receipt_payload, text_payload, WhatsAppChannel,
    DEFAULT_HEADER_TEXT,
};
