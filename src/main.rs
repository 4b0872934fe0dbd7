use anyhow::Result;
use heritage_i18n::{
    config::Config,
    db::Database,
    server::{self, AppState},
    service::TranslationService,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("heritage_i18n=info".parse()?),
        )
        .init();

    info!("Starting heritage content translation service");

    // Load configuration from environment
    let config = Config::from_env()?;
    let registry = Arc::new(config.registry()?);
    info!(
        "Languages: {:?} (default: {})",
        registry.codes().collect::<Vec<_>>(),
        registry.default_code()
    );

    let db = if config.uses_in_memory_store() {
        warn!("Using the in-memory store, content will not survive a restart");
        Database::in_memory()
    } else {
        info!("Connecting to database");
        Database::connect(&config.database_url, config.database_max_connections).await?
    };

    let state = AppState {
        service: TranslationService::new(registry, db),
        config: Arc::new(config),
    };

    server::serve(state).await
}
