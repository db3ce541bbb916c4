//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. chat-relay.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::relay::DEFAULT_SYSTEM_PROMPT;
use crate::{Error, Result};

/// デフォルトの設定ファイル名
pub const CONFIG_FILE_NAME: &str = "chat-relay.toml";

/// セッション TTL の上限 (100 年)
pub const MAX_SESSION_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Upstream model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini API key
    #[serde(default, skip_serializing)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL (for proxies or tests)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for a single upstream call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins (e.g., ["http://localhost:5173", "https://widget.example.com"])
    /// If unset, any origin is accepted
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            allowed_origins: None,
        }
    }
}

fn default_api_port() -> u16 {
    3001
}

/// セッションの保持とプロンプト窓の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 最終アクティビティからこの秒数を過ぎたセッションは破棄される
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// 期限切れセッションの掃除間隔
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// プロンプトに含める直近ターン数 (0 = 無制限)
    #[serde(default = "default_max_prompt_turns")]
    pub max_prompt_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_prompt_turns: default_max_prompt_turns(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_max_prompt_turns() -> usize {
    40
}

/// システムプロンプトの設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// システムプロンプトを差し替えるファイルのパス
    pub system_prompt_path: Option<String>,
}

impl PromptConfig {
    /// 有効なシステムプロンプトを返す
    ///
    /// パスが指定されていればファイルを読み込み、なければ組み込みのペルソナを使う。
    pub fn system_prompt(&self) -> Result<String> {
        match &self.system_prompt_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read system prompt {}: {}", path, e))
                })?;
                if text.trim().is_empty() {
                    return Err(Error::Config(format!("System prompt {} is empty", path)));
                }
                Ok(text)
            }
            None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

/// Main configuration for chat-relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Prompt configuration
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                while let Some(c) = chars.next_if(|&c| c != '}') {
                    var_name.push(c);
                }
                chars.next(); // '}' を消費

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// # 引数
    /// * `path` - TOML ファイルのパス
    ///
    /// # 環境変数展開
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;

        // 既存の環境変数で上書き（環境変数が優先）
        cfg.apply_env_overrides();
        cfg.validate()?;

        Ok(cfg)
    }

    /// TOML 文字列から設定を構築する (環境変数による上書きは行わない)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(toml))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// 1. `./chat-relay.toml` があればそれを使う
    /// 2. 見つからない場合は環境変数のみ
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE_NAME).exists() {
            return Self::from_toml_file(CONFIG_FILE_NAME);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// 起動前に満たすべき条件を検証する
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::Config(
                "GEMINI_API_KEY not set (add it to .env or chat-relay.toml)".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be positive".to_string()));
        }
        if self.session.cleanup_interval_secs == 0 {
            return Err(Error::Config(
                "session.cleanup_interval_secs must be positive".to_string(),
            ));
        }
        if self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(Error::Config(format!(
                "session.ttl_secs must not exceed {} (got {})",
                MAX_SESSION_TTL_SECS, self.session.ttl_secs
            )));
        }
        Ok(())
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let llm_config = LlmConfig {
            api_key: llm.api_key.unwrap_or_default(),
            model: llm.model.unwrap_or_else(default_model),
            base_url: llm.base_url.unwrap_or_else(default_base_url),
            timeout_secs: llm.timeout_secs.unwrap_or_else(default_timeout_secs),
        };

        let api = toml.api.unwrap_or_default();
        let api_config = ApiConfig {
            port: api.port.unwrap_or_else(default_api_port),
            allowed_origins: api.allowed_origins,
        };

        let session = toml.session.unwrap_or_default();
        let session_config = SessionConfig {
            ttl_secs: session.ttl_secs.unwrap_or_else(default_session_ttl_secs),
            cleanup_interval_secs: session
                .cleanup_interval_secs
                .unwrap_or_else(default_cleanup_interval_secs),
            max_prompt_turns: session
                .max_prompt_turns
                .unwrap_or_else(default_max_prompt_turns),
        };

        let prompt = toml.prompt.unwrap_or_default();

        Config {
            llm: llm_config,
            api: api_config,
            session: session_config,
            prompt: PromptConfig {
                system_prompt_path: prompt.system_prompt_path,
            },
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// 任意のキー検索関数で設定を上書きする
    ///
    /// 空文字列の値は未設定として扱います。
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // LLM 設定の上書き
        if let Some(api_key) = var("GEMINI_API_KEY").or_else(|| var("LLM_API_KEY")) {
            self.llm.api_key = api_key;
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = var("GEMINI_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(secs) = var("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_secs = secs;
        }

        // API 設定の上書き
        if let Some(port) = var("PORT")
            .or_else(|| var("API_PORT"))
            .and_then(|p| p.parse().ok())
        {
            self.api.port = port;
        }
        if let Some(origins) = var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        // セッション設定の上書き
        if let Some(ttl) = var("SESSION_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.session.ttl_secs = ttl;
        }
        if let Some(interval) = var("SESSION_CLEANUP_SECS").and_then(|v| v.parse().ok()) {
            self.session.cleanup_interval_secs = interval;
        }
        if let Some(turns) = var("MAX_PROMPT_TURNS").and_then(|v| v.parse().ok()) {
            self.session.max_prompt_turns = turns;
        }

        // プロンプト設定の上書き
        if let Some(path) = var("SYSTEM_PROMPT_PATH") {
            self.prompt.system_prompt_path = Some(path);
        }
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

/// TOML ファイル用のトップレベル構造
#[derive(Debug, Deserialize)]
struct TomlConfig {
    /// LLM 設定
    llm: Option<TomlLlmConfig>,
    /// HTTP API 設定
    api: Option<TomlApiConfig>,
    /// セッション設定
    session: Option<TomlSessionConfig>,
    /// プロンプト設定
    prompt: Option<TomlPromptConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// モデル名
    #[serde(default)]
    model: Option<String>,
    /// API キー
    #[serde(default)]
    api_key: Option<String>,
    /// ベース URL (オプション)
    #[serde(default)]
    base_url: Option<String>,
    /// タイムアウト秒数
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApiConfig {
    /// ポート番号
    #[serde(default)]
    port: Option<u16>,
    /// 許可する CORS オリジン
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSessionConfig {
    ttl_secs: Option<u64>,
    cleanup_interval_secs: Option<u64>,
    max_prompt_turns: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPromptConfig {
    /// システムプロンプトのファイルパス
    system_prompt_path: Option<String>,
}
