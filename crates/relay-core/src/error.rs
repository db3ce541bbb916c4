//! Error types for relay-core

use thiserror::Error;

/// Main error type for relay-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Upstream model did not respond within {0} seconds")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// クライアント側の誤り (4xx 相当) かどうか
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::InvalidRequest(_) | Self::EmptyMessage
        )
    }

    /// 上流モデル呼び出しの失敗かどうか
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::Timeout(_) | Self::Http(_) | Self::Json(_)
        )
    }
}

/// Result type alias for relay-core
pub type Result<T> = std::result::Result<T, Error>;
