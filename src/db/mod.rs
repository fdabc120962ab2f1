use anyhow::Result;
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::config::Config;

pub mod models;
pub mod paging;

pub type DbPool = SqlitePool;

pub async fn init(cfg: &Config) -> Result<DbPool> {
    let db_url = format!("sqlite://{}?mode=rwc", cfg.database.path);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(20)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true),
        )
        .await?;

    sqlx::migrate!("./src/db/migrations").run(&pool).await?;

    // WAL keeps readers unblocked while the mutation transactions commit.
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

    sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

    tracing::info!("Database connected: {}", cfg.database.path);
    Ok(pool)
}

/// Create a default admin user if no users exist yet.
pub async fn seed_admin(pool: &DbPool) -> Result<()> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if count.0 == 0 {
        sqlx::query("INSERT INTO users (name, type) VALUES ('admin', 'admin')")
            .execute(pool)
            .await?;

        tracing::warn!("Created default admin user");
    }

    Ok(())
}
