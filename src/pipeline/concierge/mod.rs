//! Concierge chat: grounded system prompt + multi-turn conversation.

pub mod chat;
pub mod prompt;

pub use chat::{ChatTurn, ConciergeChat};
pub use prompt::{build_system_instruction, hydrate_instruction};
