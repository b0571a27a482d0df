//! ÑanBot core library: WhatsApp delivery, message gateway, dialogue dispatcher and webhook,
//! used by the `nanbot` CLI.

pub mod channels;
pub mod config;
pub mod content;
pub mod delivery;
pub mod dialogue;
pub mod init;
pub mod webhook;
