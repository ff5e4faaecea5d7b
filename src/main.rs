use std::sync::Arc;

use anyhow::Context;
use japi_tutor::api::{AppState, app_router};
use japi_tutor::chat::ChatService;
use japi_tutor::config::TutorConfig;
use japi_tutor::llm::{LlmConfig, create_provider};
use japi_tutor::store::{Database, LibSqlBackend};
use japi_tutor::users::UserService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TutorConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export OPENAI_API_KEY=sk-...   (or JAPI_LLM_BACKEND=anthropic with ANTHROPIC_API_KEY)");
        std::process::exit(1);
    });

    eprintln!("📚 Japi Tutor v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({})", config.model, config.llm_backend);
    eprintln!("   API: http://0.0.0.0:{}/chats", config.port);

    let llm = create_provider(&LlmConfig::from(&config))?;

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&config.db_path))
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path))?,
    );
    eprintln!("   Database: {}", config.db_path);

    let mut chat = ChatService::new(Arc::clone(&db), llm);
    if config.serialize_per_user {
        chat = chat.with_per_user_locks();
        eprintln!("   Per-user serialization: on");
    }

    let state = AppState {
        chat: Arc::new(chat),
        users: Arc::new(UserService::new(db)),
        history_limit: config.history_limit,
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Tutor API listening");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
