//! Dialogue dispatcher: classifies each inbound event and plays the matching screen.

mod dispatcher;
mod screen;
mod store;

pub use dispatcher::{classify, is_greeting, Action, DispatchError, Dispatcher, GREETINGS};
pub use screen::{Screen, ServiceType};
pub use store::{ConversationStore, FlowState, InMemoryConversationStore};
