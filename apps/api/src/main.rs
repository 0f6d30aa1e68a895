mod ai_client;
mod chat;
mod config;
mod db;
mod errors;
mod gifts;
mod identity;
mod ledger;
mod models;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::AiClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting GiftGenie API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize session buckets
    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisSessionStore::connect(url, config.session_ttl_secs).await?),
        None => {
            warn!("REDIS_URL not set; guest sessions are kept in process memory");
            Arc::new(MemorySessionStore::with_ttl(Duration::from_secs(
                config.session_ttl_secs,
            )))
        }
    };

    // Initialize assistant client
    let ai = AiClient::new(
        config.ai_service_url.clone(),
        config.ai_service_timeout_secs.map(Duration::from_secs),
    )?;
    info!("AI service client initialized ({})", config.ai_service_url);

    let state = AppState::new(db, sessions, Arc::new(ai), config.clone());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
