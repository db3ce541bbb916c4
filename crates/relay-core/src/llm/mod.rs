//! Upstream model client and types
//!
//! Talks to Google's Gemini generateContent API.

mod client;
mod traits;
mod types;

pub use client::GeminiClient;
pub use traits::LanguageModel;
pub use types::*;
