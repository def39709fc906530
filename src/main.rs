use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turtlesoup::{
    config::AppConfig, judge::LlmJudge, llm, puzzles::PuzzleBank, state::AppState,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turtlesoup=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting turtlesoup...");

    let config = AppConfig::from_env();
    let puzzles = PuzzleBank::load(&config.puzzles_path);

    // Initialize LLM providers
    let llm_config = llm::LlmConfig::from_env();
    let llm_manager = match llm_config.build_manager() {
        Ok(manager) => {
            tracing::info!("LLM providers initialized successfully");
            Some(Arc::new(manager))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. Every question will be judged irrelevant.",
                e
            );
            None
        }
    };
    let judge = Arc::new(LlmJudge::new(llm_manager, &llm_config));

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, puzzles, judge));
    let app = turtlesoup::router(state);

    tracing::info!("Listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
