use std::sync::Arc;

use anyhow::Context as _;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod audio;
mod config;
mod pipeline;
mod transcription;
mod web;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Fail fast before serving anything: one aggregated error lists every
    // missing or invalid setting.
    let config = Config::from_env().context("startup configuration check failed")?;
    info!("Using ffmpeg at {:?}", config.ffmpeg_path);
    info!("Saving transcripts to {:?}", config.save_dir);

    let state = Arc::new(web::AppState::new(&config));
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
