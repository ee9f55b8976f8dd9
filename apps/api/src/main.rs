mod config;
mod db;
mod errors;
mod models;
mod resumes;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = &config.rust_log;
            EnvFilter::new(format!("{}={level},tower_http={level}", env!("CARGO_PKG_NAME")))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url, config.db_max_connections).await?;
    ensure_schema(&db).await?;

    info!("CORS origin: {}", config.cors_origin);

    let state = AppState {
        db,
        config: config.clone(),
    };

    let app = build_router(state)?.layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
