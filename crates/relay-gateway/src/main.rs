//! chat-relay: main binary
//!
//! Main entry point for the chat widget relay server.
//!
//! Usage:
//!   chat-relay           - Start the HTTP server
//!   chat-relay --check   - Validate configuration and exit
//!   chat-relay --help    - Show help

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use relay_api::AppState;
use relay_core::{
    Config, ConversationRelay, GeminiClient, PromptBuilder, SessionManager, SessionStore,
};
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Serve the HTTP API
    Server,
    /// Validate configuration only
    Check,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args();

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("chat-relay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // .env を先に読み込み、RUST_LOG をログ設定に反映させる
    let filter = load_env(None);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // 設定の不備はリクエストを受け付ける前に致命的エラーとして扱う
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    let system_prompt = config
        .prompt
        .system_prompt()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if let RunMode::Check = mode {
        println!("Configuration OK (model: {}, port: {})", config.llm.model, config.api.port);
        return Ok(());
    }

    tracing::info!("Starting chat-relay...");
    tracing::info!("Model: {}", config.llm.model);

    let gemini = GeminiClient::new(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to create Gemini client: {}", e))?;

    run_server(config, gemini, system_prompt).await
}

/// Load `.env` and build the log filter from the resulting environment
///
/// Without `RUST_LOG` the filter defaults to `info`.
fn load_env(env_file: Option<&Path>) -> EnvFilter {
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    let args: Vec<String> = std::env::args().collect();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--check" => return RunMode::Check,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("chat-relay - STEMROBO chat widget backend");
    println!();
    println!("Usage:");
    println!("  chat-relay           Start the HTTP server");
    println!("  chat-relay --check   Validate configuration and exit");
    println!("  chat-relay --help    Show this help message");
    println!("  chat-relay --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  GEMINI_API_KEY       Gemini API key (required)");
    println!("  GEMINI_MODEL         Model name (default: gemini-2.5-flash)");
    println!("  GEMINI_BASE_URL      Custom API endpoint");
    println!("  LLM_TIMEOUT_SECS     Upstream timeout (default: 60)");
    println!("  PORT / API_PORT      HTTP port (default: 3001)");
    println!("  API_ALLOWED_ORIGINS  Comma-separated CORS origins (default: any)");
    println!("  SESSION_TTL_SECS     Idle session lifetime (default: 3600)");
    println!("  SESSION_CLEANUP_SECS Expiry sweep interval (default: 300)");
    println!("  MAX_PROMPT_TURNS     Turns sent to the model (default: 40, 0 = all)");
    println!("  SYSTEM_PROMPT_PATH   File replacing the built-in persona");
}

/// Run the HTTP server until Ctrl+C
async fn run_server(
    config: Config,
    gemini: GeminiClient,
    system_prompt: String,
) -> anyhow::Result<()> {
    let store = SessionStore::new();
    let sessions = Arc::new(SessionManager::new(store.clone(), &config.session));

    let prompt = PromptBuilder::new(system_prompt).with_max_turns(config.session.max_prompt_turns);
    let relay = ConversationRelay::new(store, Arc::new(gemini), prompt)
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));

    let cleanup = Arc::clone(&sessions).start_cleanup_task();
    tracing::info!(
        "Session expiry: {}s idle, swept every {}s",
        config.session.ttl_secs,
        config.session.cleanup_interval_secs
    );

    let state = AppState::new(relay, sessions);
    let result = relay_api::start_server(&config.api, state, shutdown_signal()).await;

    cleanup.abort();
    tracing::info!("Shutdown complete");
    result
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
