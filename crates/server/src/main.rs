// crates/server/src/main.rs
//! Gateway server binary.
//!
//! Loads configuration from the environment, wires the tracker client,
//! cache engine, tool registry, and LLM provider together, and serves the
//! HTTP surface. Missing required environment is the only non-zero exit.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use redmine_copilot_core::llm::AnthropicProvider;
use redmine_copilot_core::Config;
use redmine_copilot_server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing. Respects RUST_LOG env var, defaults to info.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let llm = Arc::new(
        AnthropicProvider::new(&config.anthropic_api_key, &config.llm_model)
            .context("building LLM provider")?,
    );
    tracing::info!(model = %config.llm_model, tracker = %config.redmine_base_url, "gateway starting");

    let port = config.port;
    let state = AppState::new(config, llm).context("building application state")?;
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
