//! Upstream model trait definition

use async_trait::async_trait;

use super::types::Prompt;
use crate::Result;

/// A generative-text service the relay can forward prompts to
///
/// `Ok(None)` means the call succeeded but produced no usable text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name, for logging
    fn model(&self) -> &str;

    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &Prompt) -> Result<Option<String>>;
}
