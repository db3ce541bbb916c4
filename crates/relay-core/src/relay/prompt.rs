//! Prompt assembly

use crate::llm::Prompt;
use crate::session::{Role, Turn};

/// Built-in STEMROBO Assistant persona
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../prompts/stemrobo_assistant.txt");

const CONVERSATION_MARKER: &str = "---conversation---";

/// Renders a turn history into a prompt for the upstream model
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
    /// Most recent turns kept in the transcript (0 = unlimited)
    max_turns: usize,
}

impl PromptBuilder {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_turns: 0,
        }
    }

    /// Limit the transcript to the most recent `max_turns` turns
    ///
    /// A window that would open on an assistant turn drops that turn so the
    /// transcript starts with the user.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the prompt: transcript lines followed by the assistant cue
    pub fn build(&self, turns: &[Turn]) -> Prompt {
        let window = if self.max_turns > 0 && turns.len() > self.max_turns {
            let mut start = turns.len() - self.max_turns;
            if turns[start].role == Role::Assistant && start + 1 < turns.len() {
                start += 1;
            }
            &turns[start..]
        } else {
            turns
        };

        let mut conversation = String::from(CONVERSATION_MARKER);
        for turn in window {
            conversation.push('\n');
            conversation.push_str(turn.role.label());
            conversation.push_str(": ");
            conversation.push_str(&turn.text);
        }
        conversation.push('\n');
        conversation.push_str(Role::Assistant.label());
        conversation.push(':');

        Prompt {
            system: self.system_prompt.clone(),
            conversation,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_transcript() {
        let builder = PromptBuilder::new("Be helpful.");
        let turns = vec![
            Turn::user("Hi"),
            Turn::assistant("Hello! How can I help?"),
            Turn::user("Tell me about STEMROBO"),
        ];

        let prompt = builder.build(&turns);

        assert_eq!(prompt.system, "Be helpful.");
        assert_eq!(
            prompt.conversation,
            "---conversation---\nUser: Hi\nAssistant: Hello! How can I help?\nUser: Tell me about STEMROBO\nAssistant:"
        );
    }

    #[test]
    fn test_window_keeps_latest_turns() {
        let builder = PromptBuilder::new("S").with_max_turns(3);
        let turns = vec![
            Turn::user("first"),
            Turn::assistant("one"),
            Turn::user("second"),
            Turn::assistant("two"),
            Turn::user("third"),
        ];

        let prompt = builder.build(&turns);

        assert!(!prompt.conversation.contains("first"));
        assert_eq!(
            prompt.conversation,
            "---conversation---\nUser: second\nAssistant: two\nUser: third\nAssistant:"
        );
    }

    #[test]
    fn test_window_starts_on_user_turn() {
        let builder = PromptBuilder::new("S").with_max_turns(2);
        let turns = vec![
            Turn::user("first"),
            Turn::assistant("one"),
            Turn::user("second"),
            Turn::assistant("two"),
            Turn::user("third"),
        ];

        let prompt = builder.build(&turns);

        assert!(!prompt.conversation.contains("two"));
        assert_eq!(prompt.conversation, "---conversation---\nUser: third\nAssistant:");
    }

    #[test]
    fn test_default_persona() {
        let builder = PromptBuilder::default();
        assert!(builder.system_prompt().contains("STEMROBO Assistant"));
    }
}
