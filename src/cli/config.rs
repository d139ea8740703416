//! How the CLI reaches the service: directly through the database for
//! account work, over HTTP for health checks.

use anyhow::{bail, Context};
use std::time::Duration;

use crate::database::{DatabaseManager, Store};
use crate::state::AppState;

/// Server URL used when neither `--url` nor `ROSTER_URL` is given.
pub fn default_server_url() -> String {
    format!("http://localhost:{}", crate::config::config().api.port)
}

pub fn resolve_server_url(provided: Option<String>) -> String {
    provided
        .or_else(|| std::env::var("ROSTER_URL").ok())
        .unwrap_or_else(default_server_url)
        .trim_end_matches('/')
        .to_string()
}

/// Application state over the configured Postgres database.
///
/// Account commands write to the same tables the server reads, so the
/// in-memory store is of no use here.
pub async fn open_state() -> anyhow::Result<AppState> {
    let config = crate::config::config().clone();
    config.validate()?;
    if config.database.url.is_none() {
        bail!("DATABASE_URL must be set for this command");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    Ok(AppState::new(Store::postgres(pool), config))
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub url: String,
    pub status: u16,
    pub body: serde_json::Value,
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub async fn fetch_health(base_url: &str) -> anyhow::Result<HealthReport> {
    let url = format!("{}/health", base_url);
    let response = reqwest::Client::new()
        .get(&url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .with_context(|| format!("could not reach {}", url))?;

    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(serde_json::Value::Null);
    Ok(HealthReport { url, status, body })
}
