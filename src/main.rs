mod config;
mod db;
mod donations;
mod error;
mod profile;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::db::models::Charity;
use crate::db::repository::{DynLedger, SqliteLedger};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    let store: DynLedger = Arc::new(SqliteLedger::new(pool));

    // First boot seeds the default charities; reruns are no-ops.
    let seeded = store.seed_charities(&Charity::defaults()).await?;
    if seeded > 0 {
        tracing::info!("Seeded {} default charities", seeded);
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        store,
    };

    // Build router
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = &config.server.cors_origins;
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
