//! Conversation relay
//!
//! Turns a new user message plus prior history into a model-generated reply.

mod conversation;
mod prompt;

pub use conversation::{ConversationRelay, FALLBACK_REPLY};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, PromptBuilder};
