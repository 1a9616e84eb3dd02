//! Conversation system: step-by-step parameter collection.
//!
//! A conversation asks a fixed sequence of questions (the slots), validates
//! and normalizes each answer, and once every slot is filled hands the
//! collected values to the analysis pipeline exactly once. The state of a
//! conversation is an explicit `ConversationState` value owned by the host
//! session; the `Collector` is stateless and shared.

pub mod collector;
pub mod prompts;
pub mod slot;
pub mod state;

pub use collector::{Collector, DEFAULT_DISPATCH_TIMEOUT};
pub use prompts::TERMINATED_MESSAGE;
pub use slot::{Answer, Slot};
pub use state::{CompletedSelections, ConversationState, Phase, Selections};
