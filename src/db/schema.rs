//! Schema definition

use sqlx::SqlitePool;

/// Create tables and indexes if they do not exist. Safe to re-run.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ocr_results (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            file_hash TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            text TEXT NOT NULL,
            html TEXT,
            confidence REAL NOT NULL DEFAULT 0,
            method TEXT NOT NULL,
            pages INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, file_hash)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ocr_results_user ON ocr_results(user_id, updated_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ocr_results_hash ON ocr_results(user_id, file_hash)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
