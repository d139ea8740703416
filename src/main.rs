use anyhow::Context;
use tracing_subscriber::EnvFilter;

use roster_api::config;
use roster_api::database::{DatabaseManager, Store};
use roster_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("roster_api=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    config.validate()?;
    tracing::info!("Starting Roster API in {:?} mode", config.environment);

    let store = match config.database.url {
        Some(_) => {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Store::postgres(pool)
        }
        None => {
            if roster_api::is_production!() {
                tracing::warn!("DATABASE_URL is not set; records will not survive a restart");
            } else {
                tracing::info!("DATABASE_URL is not set; using the in-memory store");
            }
            Store::memory()
        }
    };

    let state = AppState::new(store, config);
    if let Some(admin) = &state.config.bootstrap {
        state.accounts().ensure_bootstrap_admin(admin).await?;
    }

    let bind_addr = format!("0.0.0.0:{}", state.config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Roster API listening on http://{}", bind_addr);
    axum::serve(listener, roster_api::app(state)).await?;
    Ok(())
}
