mod handlers;
mod server;

use anyhow::Result;
use schulmanager_ics_core::{
    IcsOptions, ProviderConfig,
    prelude::{FeedService, schulmanager::SchulmanagerProvider},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schulmanager_ics_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProviderConfig::from_env()?;
    tracing::info!("Using Schulmanager instance at {}", config.base_url);

    let provider = SchulmanagerProvider::new(config).inspect_err(|e| {
        tracing::error!("Failed to initialize provider: {}", e);
    })?;

    let state = AppState {
        feed: FeedService::new(provider),
        ics_options: IcsOptions::from_env()?,
    };

    server::start_server(state).await
}
