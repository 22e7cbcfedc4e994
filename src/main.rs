use tracing_subscriber::EnvFilter;

use booking_gate::config::AppConfig;
use booking_gate::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up GATE_BACKEND_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting booking gate in {:?} mode", config.environment);

    let state = AppState::from_config(config)?;
    server::serve(state).await
}
