//! Database layer for docflow-storage
//!
//! Free functions over a `SqlitePool`; timestamps are stored as fixed-width
//! RFC 3339 text and uuids as hyphenated text.

pub mod images;
pub mod nfts;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Open (creating if needed) the database file and ensure the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while an analysis result is being written
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image_information (
            uuid TEXT PRIMARY KEY,
            sender TEXT,
            receiver TEXT,
            creation_date TEXT NOT NULL,
            last_modified TEXT NOT NULL,
            upload_type TEXT NOT NULL,
            analysis_status TEXT NOT NULL,
            document_type TEXT NOT NULL,
            bundle_id TEXT NOT NULL,
            image_analysis_result TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_image_information_bundle ON image_information(bundle_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_image_information_status ON image_information(analysis_status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nfts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id TEXT NOT NULL UNIQUE,
            owner_address TEXT NOT NULL,
            minter_address TEXT NOT NULL,
            token_address TEXT NOT NULL,
            created_on TEXT NOT NULL,
            last_updated_on TEXT NOT NULL,
            asset_uri TEXT NOT NULL,
            asset_hash TEXT NOT NULL,
            metadata_uri TEXT NOT NULL,
            metadata_hash TEXT NOT NULL,
            additional_data TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Single-connection in-memory pool with the schema applied
///
/// `sqlite::memory:` gives every connection its own database, so the pool
/// must never open a second one.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}
