use clap::Subcommand;
use serde_json::json;

use crate::cli::config::credential_store;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::session::CredentialStore;
use crate::socket::{RoomEvent, SocketEvent, SocketManager};

#[derive(Subcommand)]
pub enum SocketCommands {
    #[command(about = "Join a room and print incoming events")]
    Join {
        #[arg(help = "Room kind: organization, appointment or public")]
        room: String,
        #[arg(help = "Organization or appointment id")]
        id: Option<String>,
    },
}

pub async fn handle(cmd: SocketCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SocketCommands::Join { room, id } => {
            let event = RoomEvent::parse(&format!("join:{}", room), id.as_deref())?;
            let stored = credential_store()?.load().await?;

            let mut manager = SocketManager::new(config.socket.clone(), stored.credentials.access_token().map(String::from));
            let mut events = manager.connect();
            manager.emit(event)?;

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        manager.close().await;
                        return output_success(&output_format, "Socket closed", None);
                    }
                    event = events.recv() => match event {
                        Some(SocketEvent::Message(message)) => match output_format {
                            OutputFormat::Json => println!("{}", json!({ "event": message.event, "data": message.data })),
                            OutputFormat::Text => println!("{} {}", message.event, message.data),
                        },
                        Some(SocketEvent::GaveUp) => anyhow::bail!("gave up reconnecting to {}", config.socket.url),
                        Some(SocketEvent::Closed) | None => return Ok(()),
                        Some(other) => tracing::info!("socket: {:?}", other),
                    },
                }
            }
        }
    }
}
