//! Knowledge Nexus - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the research task API.

use knowledge_nexus::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knowledge_nexus=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, llm={}, search={}",
        config.default_model,
        if config.openrouter_api_key.is_some() { "openrouter" } else { "unavailable" },
        if config.tavily_api_key.is_some() { "tavily" } else { "simulated" },
    );

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    api::serve(config).await?;

    Ok(())
}
