//! Database migration runner for Coinpurse.
//!
//! Reads the target from `DATABASE_URL` (or `-u <url>`):
//!   migrator up      - Run all pending migrations
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The server applies pending migrations on startup, so this is only
//! needed for manual schema work.

use coinpurse_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    cli::run_cli(Migrator).await;
}
