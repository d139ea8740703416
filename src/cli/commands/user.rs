use clap::Subcommand;
use serde_json::json;

use crate::cli::config::open_state;
use crate::cli::utils::{output_collection, output_success};
use crate::cli::OutputFormat;
use crate::policy::Permission;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Create {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password")]
        password: String,
        #[arg(long, help = "Grant every permission implicitly")]
        superuser: bool,
    },

    #[command(about = "List user accounts")]
    List,

    #[command(about = "Grant a permission, e.g. delete_team")]
    Grant {
        username: String,
        permission: Permission,
    },

    #[command(about = "Revoke a permission")]
    Revoke {
        username: String,
        permission: Permission,
    },

    #[command(about = "Show the permissions granted to a user")]
    Permissions { username: String },

    #[command(about = "Allow a user to authenticate again")]
    Activate { username: String },

    #[command(about = "Stop a user from authenticating")]
    Deactivate { username: String },

    #[command(about = "Issue a bearer token for a user")]
    Token { username: String },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let accounts = open_state().await?.accounts();

    match cmd {
        UserCommands::Create { username, password, superuser } => {
            let user = accounts.create_user(&username, &password, superuser).await?;
            output_success(
                &output_format,
                &format!("User '{}' created", user.username),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::List => {
            let users = accounts.list_users().await?;
            output_collection(&output_format, "users", &users, "No users", |u| {
                let mut flags = Vec::new();
                if u.is_superuser {
                    flags.push("superuser");
                }
                if !u.is_active {
                    flags.push("inactive");
                }
                format!("{:>4}  {}  {}", u.id, u.username, flags.join(","))
            })
        }
        UserCommands::Grant { username, permission } => {
            accounts.grant(&username, permission).await?;
            output_success(&output_format, &format!("Granted {} to '{}'", permission, username), None)
        }
        UserCommands::Revoke { username, permission } => {
            let message = if accounts.revoke(&username, permission).await? {
                format!("Revoked {} from '{}'", permission, username)
            } else {
                format!("'{}' did not hold {}", username, permission)
            };
            output_success(&output_format, &message, None)
        }
        UserCommands::Permissions { username } => {
            let permissions: Vec<Permission> = accounts.permissions(&username).await?.into_iter().collect();
            output_collection(&output_format, "permissions", &permissions, "No permissions", |p| {
                p.codename().to_string()
            })
        }
        UserCommands::Activate { username } => {
            accounts.set_active(&username, true).await?;
            output_success(&output_format, &format!("User '{}' activated", username), None)
        }
        UserCommands::Deactivate { username } => {
            accounts.set_active(&username, false).await?;
            output_success(&output_format, &format!("User '{}' deactivated", username), None)
        }
        UserCommands::Token { username } => {
            let user = accounts.user_by_username(&username).await?;
            let token = accounts.issue_token(&user)?;
            match output_format {
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("Token issued for '{}'", username),
                    Some(json!({ "token": token })),
                ),
            }
        }
    }
}
