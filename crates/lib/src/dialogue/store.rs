//! Per-sender conversation flow state.
//!
//! Process-lifetime only. Concurrent turns for the same sender are last-write-wins.

use crate::dialogue::ServiceType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where a sender is in a multi-turn flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    /// A quote form was shown; the next free-text message carries the details.
    AwaitingQuoteDetails(ServiceType),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Current flow for `sender`; `Idle` when nothing is stored.
    async fn get(&self, sender: &str) -> FlowState;
    async fn set(&self, sender: &str, state: FlowState);
    async fn clear(&self, sender: &str);
}

/// In-memory store keyed by sender id.
#[derive(Default)]
pub struct InMemoryConversationStore {
    inner: Arc<RwLock<HashMap<String, FlowState>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of senders with a non-idle flow.
    pub async fn active(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, sender: &str) -> FlowState {
        self.inner
            .read()
            .await
            .get(sender)
            .copied()
            .unwrap_or_default()
    }

    async fn set(&self, sender: &str, state: FlowState) {
        let mut map = self.inner.write().await;
        if state == FlowState::Idle {
            map.remove(sender);
        } else {
            map.insert(sender.to_string(), state);
        }
    }

    async fn clear(&self, sender: &str) {
        self.inner.write().await.remove(sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_sender_is_idle() {
        let store = InMemoryConversationStore::new();
        assert_eq!(store.get("+51900000000").await, FlowState::Idle);
    }

    #[tokio::test]
    async fn set_get_clear() {
        let store = InMemoryConversationStore::new();
        let awaiting = FlowState::AwaitingQuoteDetails(ServiceType::Flete);
        store.set("a", awaiting).await;
        store.set("b", FlowState::Idle).await;
        assert_eq!(store.get("a").await, awaiting);
        assert_eq!(store.active().await, 1);
        store.clear("a").await;
        assert_eq!(store.get("a").await, FlowState::Idle);
        assert_eq!(store.active().await, 0);
    }

    #[tokio::test]
    async fn setting_idle_drops_the_entry() {
        let store = InMemoryConversationStore::new();
        store
            .set("a", FlowState::AwaitingQuoteDetails(ServiceType::Basic))
            .await;
        store.set("a", FlowState::Idle).await;
        assert_eq!(store.active().await, 0);
    }
}
