use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::time::ChronoLocal;

use screenlive_relay::config::Config;
use screenlive_relay::server::{self, AppState};
use screenlive_relay::upstream::{GeminiClient, GenerateContent};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load relay configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!(model = %config.model, "starting screenlive relay");

    let upstream: Arc<dyn GenerateContent> =
        Arc::new(GeminiClient::new(config.api_key.clone(), &config.model));
    let app = server::create_router(AppState { upstream });

    let addr = config.listen_addr();
    tracing::info!("listening on ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
