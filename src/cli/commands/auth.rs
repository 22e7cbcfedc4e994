use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;

use crate::cli::config::credential_store;
use crate::cli::utils::{output_auth_state, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::identity::Credentials;
use crate::session::AuthSession;
use crate::validator::HttpIdentityClient;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Store tokens issued by the backend and validate them")]
    Login {
        #[arg(long, help = "Access token")]
        access_token: String,
        #[arg(long, help = "Refresh token")]
        refresh_token: Option<String>,
    },

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Revoke the refresh token and forget local credentials")]
    Logout,
}

fn session(config: &AppConfig) -> anyhow::Result<AuthSession> {
    let client = Arc::new(HttpIdentityClient::from_config(&config.gate)?);
    Ok(AuthSession::new(
        Arc::new(credential_store()?),
        client.clone(),
        client,
        config.gate.login_path.clone(),
    ))
}

pub async fn handle(cmd: AuthCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = session(config)?;

    match cmd {
        AuthCommands::Login { access_token, refresh_token } => {
            let state = session.sign_in(Credentials::new(access_token, refresh_token)).await;
            if !state.authenticated {
                output_error(&output_format, "Token was rejected by the identity service", Some("UNAUTHORIZED"))?;
                anyhow::bail!("login failed");
            }
            output_auth_state(&output_format, &state)
        }
        AuthCommands::Status => {
            let state = session.mount().await;
            output_auth_state(&output_format, &state)
        }
        AuthCommands::Logout => {
            let next = session.logout().await;
            output_success(&output_format, "Logged out", Some(json!({ "redirect": next })))
        }
    }
}
