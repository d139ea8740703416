use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{fetch_health, open_state, resolve_server_url};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Check server health status from the /health endpoint")]
    Health {
        #[arg(long, help = "Server URL (defaults to ROSTER_URL or localhost)")]
        url: Option<String>,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Migrate => {
            let state = open_state().await?;
            let pool = state
                .store
                .pool()
                .ok_or_else(|| anyhow::anyhow!("migrations need a Postgres store"))?;
            DatabaseManager::migrate(pool).await?;
            output_success(&output_format, "Migrations applied", None)
        }
        ServerCommands::Health { url } => {
            let report = fetch_health(&resolve_server_url(url)).await?;
            if !report.is_up() {
                anyhow::bail!("{} answered {}", report.url, report.status);
            }
            output_success(
                &output_format,
                &format!("{} is up", report.url),
                Some(json!({ "health": report.body })),
            )
        }
    }
}
