pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "gatectl")]
#[command(about = "Booking gate CLI - route checks, session management and room subscriptions")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP gate server")]
    Serve,

    #[command(about = "Inspect the route table")]
    Routes {
        #[command(subcommand)]
        cmd: commands::routes::RoutesCommands,
    },

    #[command(about = "Session credentials and validation")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Realtime room subscriptions")]
    Socket {
        #[command(subcommand)]
        cmd: commands::socket::SocketCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let app_config = crate::config::AppConfig::from_env();

    match cli.command {
        Commands::Serve => commands::serve::handle(app_config).await,
        Commands::Routes { cmd } => commands::routes::handle(cmd, &app_config, output_format),
        Commands::Auth { cmd } => commands::auth::handle(cmd, &app_config, output_format).await,
        Commands::Socket { cmd } => commands::socket::handle(cmd, &app_config, output_format).await,
    }
}
