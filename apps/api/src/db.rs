use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates and returns a SQLite connection pool, creating the database file if needed.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    info!("Connecting to SQLite at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL '{database_url}'"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates the `resumes` table if it does not exist yet.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resumes (
            id          TEXT PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            tags        TEXT NOT NULL DEFAULT '[]',
            lastEdited  TIMESTAMP NOT NULL,
            data        TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resumes_last_edited ON resumes (lastEdited)")
        .execute(pool)
        .await?;

    info!("Schema ready");
    Ok(())
}
