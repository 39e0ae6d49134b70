mod agent;
mod config;
mod errors;
mod models;
mod routes;
mod service;

use std::sync::Arc;

use tracing::info;

use crate::agent::OllamaAgentService;
use crate::config::ServerConfig;
use crate::service::query_service::QueryService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_chat=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let agent = OllamaAgentService::new(&config.ollama_base_url, &config.model)?;
    info!("Answering with '{}' at {}", config.model, config.ollama_base_url);
    let query_service = QueryService::new(Arc::new(agent), config.chunk_size);

    // ── Router ────────────────────────────────────────────────────────────────
    info!("Serving widget from {}", config.static_dir.display());
    let app = routes::app(query_service, &config.static_dir);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
