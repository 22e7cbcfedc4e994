use crate::config::AppConfig;
use crate::server::{self, AppState};

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting booking gate in {:?} mode", config.environment);
    let state = AppState::from_config(config)?;
    server::serve(state).await
}
