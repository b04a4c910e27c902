use anyhow::{Context, Result};
use qa_api::{app, AppState};
use qa_system::{Config, QaPipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Arc::new(Config::from_env()?);
    log::info!(
        "Using model {} with a {} token limit, uploads in {}",
        config.model,
        config.max_token_limit,
        config.upload_dir.display()
    );

    let pipeline = QaPipeline::from_config(config.clone())?;
    let app = app(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
