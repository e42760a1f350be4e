//! # Hearth API Server
//!
//! Serves every Hearth application from one process under `/v1`, backed by
//! a single PostgreSQL database.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/hearth JWT_SECRET=... cargo run -p hearth-api
//! ```

use hearth_api::{
    app::{build_router, AppState},
    config::Config,
};
use hearth_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, pool_stats, PoolConfig},
};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "hearth_api=debug,hearth_shared=info,tower_http=debug";

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded first so .env can also set RUST_LOG
    let config = Config::from_env()?;
    init_tracing(config.api.json_logs);

    tracing::info!(
        "Hearth API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(PoolConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let stats = pool_stats(&pool);
    tracing::info!(
        total = stats.total_connections,
        idle = stats.idle_connections,
        "Database ready"
    );

    let address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
