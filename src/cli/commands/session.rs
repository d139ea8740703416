use clap::Subcommand;
use serde_json::json;

use crate::cli::config::open_state;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum SessionCommands {
    #[command(about = "Delete expired login sessions")]
    Purge,
}

pub async fn handle(cmd: SessionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SessionCommands::Purge => {
            let purged = open_state().await?.accounts().purge_expired_sessions().await?;
            output_success(
                &output_format,
                &format!("Purged {} expired session(s)", purged),
                Some(json!({ "purged": purged })),
            )
        }
    }
}
