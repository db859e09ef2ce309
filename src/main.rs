use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use fastener_api::app::{app, AppState};
use fastener_api::auth::TokenSettings;
use fastener_api::config;
use fastener_api::database::{DatabaseManager, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_filter = if config.api.enable_request_logging {
        "info,sqlx=warn,tower_http=debug"
    } else {
        "info,sqlx=warn,tower_http=off"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("Starting Fastener API in {:?} mode", config.environment);

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    let database = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.run_migrations {
        database.migrate().await.context("failed to apply migrations")?;
    }

    let store = Arc::new(PgStore::new(database.pool().clone()));
    let tokens = TokenSettings::new(
        config.security.jwt_secret.clone(),
        config.security.jwt_expiry_hours,
    );
    let state = AppState::new(store, tokens, config.api.max_request_size_bytes)
        .with_database(database.clone());

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Fastener API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
