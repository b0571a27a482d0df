//! Per-event dispatch: classify, mark read, play screens, recover.

use crate::channels::{EventKind, InboundEvent, Outbound};
use crate::content::{Catalog, Step};
use crate::delivery::{DeliveryError, Sleeper, TokioSleeper};
use crate::dialogue::{ConversationStore, FlowState, Screen, ServiceType};
use std::sync::Arc;

/// Words that restart the conversation from the welcome screen.
pub const GREETINGS: [&str; 9] = [
    "hola", "hello", "hi", "buenos", "buenas", "menu", "ayuda", "help", "servicios",
];

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("catalog has no content for screen '{0}'")]
    MissingScreen(Screen),
}

/// What one inbound event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Welcome sequence followed by the main menu.
    Welcome,
    Show(Screen),
    /// Free text answering an open quote form.
    QuoteDetails {
        service: ServiceType,
        details: String,
    },
    /// Nothing to send (missing or empty text, button reply without id).
    Ignore,
}

/// True when any whitespace-separated word of `text` is a greeting, ignoring case.
pub fn is_greeting(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.split_whitespace().any(|w| GREETINGS.contains(&w))
}

/// Decide the action for `event` given the sender's current flow. No side effects.
pub fn classify(event: &InboundEvent, flow: FlowState) -> Action {
    match event.kind() {
        EventKind::Text(body) => {
            let Some(body) = body.filter(|b| !b.is_empty()) else {
                return Action::Ignore;
            };
            if is_greeting(body) {
                return Action::Welcome;
            }
            let body = body.trim();
            if body.is_empty() {
                return Action::Show(Screen::MainMenu);
            }
            match flow {
                FlowState::AwaitingQuoteDetails(service) => Action::QuoteDetails {
                    service,
                    details: body.to_string(),
                },
                FlowState::Idle => Action::Show(Screen::MainMenu),
            }
        }
        EventKind::ButtonReply(id) => match id.filter(|s| !s.is_empty()) {
            Some(id) => Action::Show(Screen::from_button_id(id).unwrap_or(Screen::MainMenu)),
            None => Action::Ignore,
        },
        EventKind::Media(_) => Action::Show(Screen::MediaReceived),
        EventKind::Other(_) => Action::Show(Screen::MainMenu),
    }
}

fn next_flow(action: &Action, current: FlowState) -> FlowState {
    match action {
        Action::Welcome | Action::QuoteDetails { .. } => FlowState::Idle,
        Action::Show(screen) => screen
            .quote_service()
            .map(FlowState::AwaitingQuoteDetails)
            .unwrap_or(current),
        Action::Ignore => current,
    }
}

/// Drives the dialogue for every sender. Cheap to clone; each inbound event is handled on its own task.
#[derive(Clone)]
pub struct Dispatcher {
    outbound: Arc<dyn Outbound>,
    store: Arc<dyn ConversationStore>,
    catalog: Arc<Catalog>,
    sleeper: Arc<dyn Sleeper>,
    pacing: bool,
}

impl Dispatcher {
    pub fn new(
        outbound: Arc<dyn Outbound>,
        store: Arc<dyn ConversationStore>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            outbound,
            store,
            catalog,
            sleeper: Arc::new(TokioSleeper),
            pacing: true,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// When false, pause steps between sends are skipped. Send order is unchanged.
    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    /// Handle one inbound event to completion. Never fails: errors are logged and answered
    /// with the error text plus the main menu.
    pub async fn handle(&self, event: &InboundEvent) {
        let Some(to) = event.sender() else {
            log::warn!("discarding inbound '{}' event without sender", event.typ);
            return;
        };
        self.outbound.mark_as_read(event.message_id()).await;

        let flow = self.store.get(to).await;
        let action = classify(event, flow);
        if let EventKind::ButtonReply(Some(id)) = event.kind() {
            if !id.is_empty() && Screen::from_button_id(id).is_none() {
                log::warn!("unrecognized button id '{}' from {}; showing main menu", id, to);
            }
        }
        log::debug!("{} ({:?}): {:?}", to, flow, action);

        if let Err(e) = self.perform(to, &action, flow).await {
            log::error!("handling {:?} for {} failed: {}", action, to, e);
            self.recover(to).await;
        }
    }

    async fn perform(&self, to: &str, action: &Action, flow: FlowState) -> Result<(), DispatchError> {
        let next = next_flow(action, flow);
        // Resets apply even if the sends below fail; entering a flow needs the form delivered.
        if next == FlowState::Idle && flow != FlowState::Idle {
            self.store.set(to, FlowState::Idle).await;
        }
        match action {
            Action::Ignore => {
                log::debug!("nothing to send for {}", to);
            }
            Action::Welcome => {
                self.play(to, Screen::Welcome).await?;
                self.show_main_menu(to).await?;
            }
            Action::Show(Screen::MainMenu) => self.show_main_menu(to).await?,
            Action::Show(screen) => self.play(to, *screen).await?,
            Action::QuoteDetails { service, details } => {
                log::info!(
                    "quote request ({}) from {}: {}",
                    service.as_str(),
                    to,
                    details
                );
                self.play(to, Screen::QuoteReceived).await?;
            }
        }
        if next != FlowState::Idle && next != flow {
            self.store.set(to, next).await;
        }
        Ok(())
    }

    /// Interactive main menu, or the plain-text menu when the interactive send fails.
    async fn show_main_menu(&self, to: &str) -> Result<(), DispatchError> {
        match self.play(to, Screen::MainMenu).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("main menu for {} failed ({}); sending text menu", to, e);
                self.play(to, Screen::SimpleMenu).await
            }
        }
    }

    async fn recover(&self, to: &str) {
        let result: Result<(), DispatchError> = async {
            self.play(to, Screen::Error).await?;
            self.show_main_menu(to).await
        }
        .await;
        if let Err(e) = result {
            log::error!("recovery for {} failed, giving up on this turn: {}", to, e);
        }
    }

    async fn play(&self, to: &str, screen: Screen) -> Result<(), DispatchError> {
        let steps = self
            .catalog
            .steps(screen)
            .ok_or(DispatchError::MissingScreen(screen))?;
        for step in steps {
            match step {
                Step::Send(message) => self.outbound.send(to, message).await?,
                Step::Pause(wait) => {
                    if self.pacing {
                        self.sleeper.sleep(*wait).await;
                    }
                }
            }
        }
        Ok(())
    }
}
