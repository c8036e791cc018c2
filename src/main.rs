use std::sync::Arc;

use opsdesk::config::Config;
use opsdesk::db::ArchiveDb;
use opsdesk::embeddings::Embedder;
use opsdesk::server;
use opsdesk::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    log::info!("Data directory: {}", config.data_dir.display());

    let db = ArchiveDb::open(&config)?;
    let embedder = Embedder::initialize();
    let state = Arc::new(AppState::new(config, db, embedder));

    let addr = format!("0.0.0.0:{}", state.config.http_port);
    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
