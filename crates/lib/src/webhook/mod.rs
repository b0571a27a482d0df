//! Inbound HTTP boundary: the webhook the messaging platform (or a relay) posts events to.

mod protocol;
mod server;

pub use protocol::{parse_envelope, VerifyQuery, WebhookEnvelope, MESSAGE_CREATED};
pub use server::{build_dispatcher, router, run_server, WebhookState, HOOK_PATH};
