//! Database migration runner for Corebook.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The connection comes from the loaded configuration, so
//! `COREBOOK__DATABASE__URL` and `config/{RUN_MODE}.toml` apply.

use anyhow::{Context, bail};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corebook_db::{connect, migration::Migrator};
use corebook_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corebook=debug,migrator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    match command.as_str() {
        "up" => {
            Migrator::up(&db, None).await?;
            info!("Migrations applied");
        }
        "down" => {
            Migrator::down(&db, Some(1)).await?;
            info!("Last migration rolled back");
        }
        "status" => Migrator::status(&db).await?,
        "fresh" => {
            Migrator::fresh(&db).await?;
            info!("Schema recreated");
        }
        other => bail!("unknown command '{other}', expected up, down, status or fresh"),
    }

    Ok(())
}
