//! relay-core: チャットウィジェット用会話リレーのコアライブラリ
//!
//! セッション管理、Gemini API との通信、プロンプト組み立て、
//! 会話リレーのコア機能を提供します。

pub mod config;
pub mod error;
pub mod llm;
pub mod relay;
pub mod session;

pub use config::{ApiConfig, Config, LlmConfig, PromptConfig, SessionConfig};
pub use error::{Error, Result};
pub use llm::{GeminiClient, LanguageModel, Prompt};
pub use relay::{ConversationRelay, FALLBACK_REPLY, PromptBuilder};
pub use session::{Role, Session, SessionManager, SessionStore, Turn};
