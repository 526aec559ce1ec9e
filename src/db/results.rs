//! OCR result cache
//!
//! Content-addressed store of finished extractions, keyed per user by a
//! hash of the file identity (name + size). Re-uploading the same file
//! replaces the previous entry via the UNIQUE(user_id, file_hash)
//! constraint; the constraint is the only duplicate arbiter.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// Hash identifying one file for one user. Matches entries written by
/// earlier clients, so the formula must not change.
pub fn file_identity_hash(user_id: &str, file_name: &str, file_size: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}_{}", user_id, file_name, file_size));
    hex::encode(hasher.finalize())
}

/// Full stored result.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResultRecord {
    pub id: String,
    pub user_id: String,
    pub file_hash: String,
    pub file_name: String,
    pub file_size: i64,
    pub text: String,
    pub html: Option<String>,
    pub confidence: f64,
    pub method: String,
    pub pages: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// List projection: everything except the (potentially large) text bodies.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResultSummary {
    pub id: String,
    pub file_hash: String,
    pub file_name: String,
    pub file_size: i64,
    pub confidence: f64,
    pub method: String,
    pub pages: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for saving a result.
#[derive(Debug, Clone)]
pub struct NewOcrResult {
    pub file_name: String,
    pub file_size: i64,
    pub text: String,
    pub html: Option<String>,
    pub confidence: f64,
    pub method: String,
    pub pages: i64,
}

#[derive(Clone)]
pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the entry for this user + file identity.
    /// Returns the stored record.
    pub async fn upsert(
        &self,
        user_id: &str,
        result: &NewOcrResult,
    ) -> Result<OcrResultRecord, sqlx::Error> {
        let file_hash = file_identity_hash(user_id, &result.file_name, result.file_size);
        let now = Utc::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO ocr_results
                (id, user_id, file_hash, file_name, file_size, text, html,
                 confidence, method, pages, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, file_hash) DO UPDATE SET
                file_name = excluded.file_name,
                file_size = excluded.file_size,
                text = excluded.text,
                html = excluded.html,
                confidence = excluded.confidence,
                method = excluded.method,
                pages = excluded.pages,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&file_hash)
        .bind(&result.file_name)
        .bind(result.file_size)
        .bind(&result.text)
        .bind(&result.html)
        .bind(result.confidence)
        .bind(&result.method)
        .bind(result.pages)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let record = self.get_by_hash(user_id, &file_hash).await?;
        record.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_hash(
        &self,
        user_id: &str,
        file_hash: &str,
    ) -> Result<Option<OcrResultRecord>, sqlx::Error> {
        sqlx::query_as::<_, OcrResultRecord>(
            "SELECT * FROM ocr_results WHERE user_id = ? AND file_hash = ?",
        )
        .bind(user_id)
        .bind(file_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// Check whether a cached result exists for this file identity.
    pub async fn check(
        &self,
        user_id: &str,
        file_name: &str,
        file_size: i64,
    ) -> Result<Option<OcrResultRecord>, sqlx::Error> {
        let file_hash = file_identity_hash(user_id, file_name, file_size);
        self.get_by_hash(user_id, &file_hash).await
    }

    /// Newest-first page of summaries plus the total entry count.
    pub async fn list(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<OcrResultSummary>, i64), sqlx::Error> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        let rows = sqlx::query_as::<_, OcrResultSummary>(
            r#"
            SELECT id, file_hash, file_name, file_size, confidence, method,
                   pages, created_at, updated_at
            FROM ocr_results
            WHERE user_id = ?
            ORDER BY updated_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM ocr_results WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total.0))
    }

    /// Delete one entry. Returns false when the id does not exist or
    /// belongs to another user.
    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ocr_results WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn sample(name: &str, text: &str) -> NewOcrResult {
        NewOcrResult {
            file_name: name.to_string(),
            file_size: 1024,
            text: text.to_string(),
            html: None,
            confidence: 91.5,
            method: "ocr".to_string(),
            pages: 3,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let store = ResultStore::new(test_pool().await);

        let first = store.upsert("user-1", &sample("a.pdf", "v1")).await.unwrap();
        let second = store.upsert("user-1", &sample("a.pdf", "v2")).await.unwrap();

        assert_eq!(first.file_hash, second.file_hash);
        assert_eq!(second.text, "v2");
        // Still exactly one row for this identity.
        let (rows, total) = store.list("user-1", 1, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_identity_hash_is_per_user() {
        let store = ResultStore::new(test_pool().await);

        store.upsert("user-1", &sample("a.pdf", "mine")).await.unwrap();
        store.upsert("user-2", &sample("a.pdf", "theirs")).await.unwrap();

        let mine = store.check("user-1", "a.pdf", 1024).await.unwrap().unwrap();
        let theirs = store.check("user-2", "a.pdf", 1024).await.unwrap().unwrap();
        assert_eq!(mine.text, "mine");
        assert_eq!(theirs.text, "theirs");
        assert_ne!(mine.file_hash, theirs.file_hash);
    }

    #[tokio::test]
    async fn test_check_misses_on_different_size() {
        let store = ResultStore::new(test_pool().await);
        store.upsert("user-1", &sample("a.pdf", "text")).await.unwrap();

        assert!(store.check("user-1", "a.pdf", 1024).await.unwrap().is_some());
        assert!(store.check("user-1", "a.pdf", 2048).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_excludes_text_and_paginates() {
        let store = ResultStore::new(test_pool().await);
        for i in 0..5 {
            store
                .upsert("user-1", &sample(&format!("doc-{}.pdf", i), "body"))
                .await
                .unwrap();
        }

        let (page1, total) = store.list("user-1", 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);

        let (page3, _) = store.list("user-1", 3, 2).await.unwrap();
        assert_eq!(page3.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_scoped_to_user() {
        let store = ResultStore::new(test_pool().await);
        let record = store.upsert("user-1", &sample("a.pdf", "body")).await.unwrap();

        assert!(!store.delete("user-2", &record.id).await.unwrap());
        assert!(store.delete("user-1", &record.id).await.unwrap());
        assert!(!store.delete("user-1", &record.id).await.unwrap());
    }

    #[test]
    fn test_identity_hash_stable() {
        let h = file_identity_hash("u", "f.pdf", 10);
        assert_eq!(h.len(), 64);
        assert_eq!(h, file_identity_hash("u", "f.pdf", 10));
        assert_ne!(h, file_identity_hash("u", "f.pdf", 11));
    }
}
