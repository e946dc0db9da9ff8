use anyhow::Result;
use monsieur_voice::{create_router, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/monsieur")?;

    info!("{} starting", cfg.service.name);
    info!("call recordings directory: {}", cfg.audio.recordings_path);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
