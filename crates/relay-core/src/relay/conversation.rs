//! Session-scoped relay to the upstream model

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::llm::LanguageModel;
use crate::relay::PromptBuilder;
use crate::session::{SessionStore, Turn};
use crate::{Error, Result};

/// Reply recorded when the upstream answers without usable text
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Relays user messages of a session to the upstream model
///
/// At most one reply per session is produced at a time; callers on the same
/// session wait for the previous reply to be recorded.
#[derive(Clone)]
pub struct ConversationRelay {
    store: SessionStore,
    model: Arc<dyn LanguageModel>,
    prompt: PromptBuilder,
    timeout: Duration,
}

impl ConversationRelay {
    pub fn new(store: SessionStore, model: Arc<dyn LanguageModel>, prompt: PromptBuilder) -> Self {
        Self {
            store,
            model,
            prompt,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound for one upstream call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append `user_text` to the session, ask the model, record and return its reply
    ///
    /// # Errors
    /// * `InvalidRequest` - the session id is unknown (nothing is recorded)
    /// * `EmptyMessage` - the message is blank (nothing is recorded)
    /// * `Upstream` / `Timeout` / `Http` - the model call failed; the user turn stays recorded
    pub async fn respond(&self, session_id: &str, user_text: &str) -> Result<String> {
        if !self.store.exists(session_id) {
            return Err(invalid_session());
        }
        if user_text.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let gate = self.store.gate(session_id).map_err(|_| invalid_session())?;
        let _guard = gate.lock().await;

        self.store
            .append(session_id, Turn::user(user_text))
            .map_err(|_| invalid_session())?;

        let turns = self.store.get(session_id)?;
        let prompt = self.prompt.build(&turns);
        debug!(
            "Prompt for session {}: {} turns, {} chars",
            session_id,
            turns.len(),
            prompt.len()
        );

        let generated = match timeout(self.timeout, self.model.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Upstream error for session {}: {}", session_id, e);
                return Err(if e.is_upstream() {
                    e
                } else {
                    Error::Upstream(e.to_string())
                });
            }
            Err(_) => {
                warn!(
                    "Upstream timed out after {:?} for session {}",
                    self.timeout, session_id
                );
                return Err(Error::Timeout(self.timeout.as_secs()));
            }
        };

        let reply = generated.unwrap_or_else(|| {
            info!("No text from {}; using fallback reply", self.model.model());
            FALLBACK_REPLY.to_string()
        });

        self.store.append(session_id, Turn::assistant(reply.clone()))?;
        Ok(reply)
    }

    /// The store replies are recorded in
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

fn invalid_session() -> Error {
    Error::InvalidRequest("Invalid or missing chatId".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Prompt;
    use crate::session::{Role, SessionManager};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model returning queued results in order, recording every prompt
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Option<String>>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<Option<String>>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<Prompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &Prompt) -> Result<Option<String>> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Some("default reply".to_string())))
        }
    }

    /// Model that echoes the last user line after a delay
    struct EchoModel {
        delay: Duration,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &Prompt) -> Result<Option<String>> {
            tokio::time::sleep(self.delay).await;
            let last_user = prompt
                .conversation
                .lines()
                .rev()
                .find_map(|line| line.strip_prefix("User: "))
                .unwrap_or_default();
            Ok(Some(format!("echo: {}", last_user)))
        }
    }

    fn setup(model: Arc<dyn LanguageModel>) -> (SessionManager, ConversationRelay) {
        let manager = SessionManager::in_memory();
        let relay = ConversationRelay::new(
            manager.store().clone(),
            model,
            PromptBuilder::new("You are a test assistant."),
        );
        (manager, relay)
    }

    #[tokio::test]
    async fn test_respond_records_both_turns() {
        let model =
            ScriptedModel::new(vec![Ok(Some("STEMROBO builds robotics kits.".to_string()))]);
        let (manager, relay) = setup(model.clone());
        let id = manager.create_session();

        let reply = relay.respond(&id, "Tell me about STEMROBO").await.unwrap();

        assert_eq!(reply, "STEMROBO builds robotics kits.");
        let turns = manager.store().get(&id).unwrap();
        assert_eq!(
            turns,
            vec![
                Turn::user("Tell me about STEMROBO"),
                Turn::assistant("STEMROBO builds robotics kits.")
            ]
        );

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].system, "You are a test assistant.");
        assert!(prompts[0].conversation.ends_with("User: Tell me about STEMROBO\nAssistant:"));
    }

    #[tokio::test]
    async fn test_two_sequential_replies() {
        let model = ScriptedModel::new(vec![
            Ok(Some("first".to_string())),
            Ok(Some("second".to_string())),
        ]);
        let (manager, relay) = setup(model.clone());
        let id = manager.create_session();

        relay.respond(&id, "hello").await.unwrap();
        relay.respond(&id, "again").await.unwrap();

        let roles: Vec<Role> = manager.store().get(&id).unwrap().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);

        // 二回目のプロンプトには一回目のやり取りが含まれる
        let prompts = model.prompts();
        assert!(prompts[1].conversation.contains("User: hello\nAssistant: first\nUser: again"));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let model = ScriptedModel::new(vec![]);
        let (manager, relay) = setup(model.clone());

        let err = relay.respond("unknown-id", "hi").await.unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(manager.session_count(), 0);
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_takes_precedence_over_empty_message() {
        let (_manager, relay) = setup(ScriptedModel::new(vec![]));
        let err = relay.respond("", "  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_empty_message() {
        let model = ScriptedModel::new(vec![]);
        let (manager, relay) = setup(model.clone());
        let id = manager.create_session();

        for text in ["", "   ", "\n\t"] {
            let err = relay.respond(&id, text).await.unwrap_err();
            assert!(matches!(err, Error::EmptyMessage));
        }

        assert!(manager.store().get(&id).unwrap().is_empty());
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_user_turn() {
        let model = ScriptedModel::new(vec![Err(Error::Upstream("quota exceeded".to_string()))]);
        let (manager, relay) = setup(model);
        let id = manager.create_session();

        let err = relay.respond(&id, "hello").await.unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(manager.store().get(&id).unwrap(), vec![Turn::user("hello")]);
    }

    #[tokio::test]
    async fn test_non_upstream_error_is_wrapped() {
        let model = ScriptedModel::new(vec![Err(Error::Other("unexpected".to_string()))]);
        let (manager, relay) = setup(model);
        let id = manager.create_session();

        let err = relay.respond(&id, "hello").await.unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_missing_text_uses_fallback() {
        let model = ScriptedModel::new(vec![Ok(None)]);
        let (manager, relay) = setup(model);
        let id = manager.create_session();

        let reply = relay.respond(&id, "hello").await.unwrap();

        assert_eq!(reply, FALLBACK_REPLY);
        let turns = manager.store().get(&id).unwrap();
        assert_eq!(turns[1], Turn::assistant(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn test_timeout() {
        let model = Arc::new(EchoModel {
            delay: Duration::from_secs(5),
        });
        let (manager, relay) = setup(model);
        let relay = relay.with_timeout(Duration::from_millis(50));
        let id = manager.create_session();

        let err = relay.respond(&id, "hello").await.unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert!(err.is_upstream());
        assert_eq!(manager.store().get(&id).unwrap(), vec![Turn::user("hello")]);
    }

    #[tokio::test]
    async fn test_concurrent_replies_do_not_interleave() {
        let model = Arc::new(EchoModel {
            delay: Duration::from_millis(30),
        });
        let (manager, relay) = setup(model);
        let id = manager.create_session();

        let (a, b) = tokio::join!(relay.respond(&id, "one"), relay.respond(&id, "two"));
        assert_eq!(a.unwrap(), "echo: one");
        assert_eq!(b.unwrap(), "echo: two");

        let turns = manager.store().get(&id).unwrap();
        assert_eq!(turns.len(), 4);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[1].text, format!("echo: {}", pair[0].text));
        }
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let model = Arc::new(EchoModel {
            delay: Duration::from_millis(10),
        });
        let (manager, relay) = setup(model);
        let s1 = manager.create_session();
        let s2 = manager.create_session();

        let (a, b) = tokio::join!(relay.respond(&s1, "alpha"), relay.respond(&s2, "beta"));
        assert_eq!(a.unwrap(), "echo: alpha");
        assert_eq!(b.unwrap(), "echo: beta");

        assert_eq!(manager.store().get(&s1).unwrap().len(), 2);
        assert_eq!(manager.store().get(&s2).unwrap()[0], Turn::user("beta"));
    }
}
