//! Coinpurse API Server
//!
//! Main entry point for the Coinpurse backend service.

use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coinpurse_api::{AppState, create_router};
use coinpurse_db::{ExchangeRateRepository, Migrator, connect};
use coinpurse_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coinpurse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    Migrator::up(&db, None)
        .await
        .context("Failed to apply migrations")?;
    info!("Database schema up to date");

    if config.currency.seed_default_rates {
        let seeded = ExchangeRateRepository::new(db.clone())
            .seed_default_rates()
            .await?;
        if seeded > 0 {
            info!(seeded, "Exchange rate table was empty; default rates installed");
        }
    }

    let app = create_router(AppState::new(db));

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
