//! SQLite index of blob records.

use std::path::Path;
use std::time::Duration;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};

use crate::error::Result;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Blob index row as stored in SQLite.
#[derive(Debug, Clone)]
pub(crate) struct BlobRow {
    pub id: String,
    pub filename: String,
    pub length: i64,
    pub metadata: String,
    pub state: BlobState,
    #[allow(dead_code)]
    pub created_at: i64,
}

/// State of a blob in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum BlobState {
    /// Blob is complete and visible to readers
    Complete,
    /// Blob upload is in progress
    #[default]
    Partial,
    /// Blob is marked for deletion
    Deleting,
}

impl BlobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobState::Complete => "complete",
            BlobState::Partial => "partial",
            BlobState::Deleting => "deleting",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "complete" => BlobState::Complete,
            "deleting" => BlobState::Deleting,
            _ => BlobState::Partial,
        }
    }
}

/// SQLite database connection pool.
#[derive(Debug, Clone)]
pub(crate) struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection from a file path.
    pub async fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create an in-memory database.
    ///
    /// Every connection to `:memory:` is its own database, so the pool is
    /// pinned to a single connection.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Reserve an index row for an upload that is about to start.
    pub async fn insert_partial(&self, id: &str, filename: &str, metadata: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO blobs (id, filename, length, metadata, state, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(filename)
        .bind(metadata)
        .bind(BlobState::Partial.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Flip a partial row to complete once every byte is durable.
    pub async fn mark_complete(&self, id: &str, length: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE blobs SET state = ?, length = ?, updated_at = ?
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(BlobState::Complete.as_str())
        .bind(length)
        .bind(now)
        .bind(id)
        .bind(BlobState::Partial.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim a complete blob for deletion. Only one caller can win the claim.
    pub async fn mark_deleting(&self, id: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE blobs SET state = ?, updated_at = ?
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(BlobState::Deleting.as_str())
        .bind(now)
        .bind(id)
        .bind(BlobState::Complete.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a complete blob row by id.
    pub async fn get_complete(&self, id: &str) -> Result<Option<BlobRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, length, metadata, state, created_at
            FROM blobs
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(id)
        .bind(BlobState::Complete.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::map_row(&r)))
    }

    /// Delete a blob row regardless of its state.
    pub async fn delete_blob(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all complete blobs, newest first.
    pub async fn list_complete(&self) -> Result<Vec<BlobRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, filename, length, metadata, state, created_at
            FROM blobs
            WHERE state = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(BlobState::Complete.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::map_row).collect())
    }

    /// Ids of rows stuck in `partial` or `deleting`.
    pub async fn list_incomplete(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM blobs WHERE state != ?")
            .bind(BlobState::Complete.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    fn map_row(r: &sqlx::sqlite::SqliteRow) -> BlobRow {
        BlobRow {
            id: r.get("id"),
            filename: r.get("filename"),
            length: r.get("length"),
            metadata: r.get("metadata"),
            state: BlobState::parse(r.get("state")),
            created_at: r.get("created_at"),
        }
    }
}

#[cfg(test)]
impl Database {
    /// Get a blob row in any state.
    pub async fn get_any(&self, id: &str) -> Result<Option<BlobRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, length, metadata, state, created_at
            FROM blobs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::map_row(&r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_partial_rows_are_hidden() {
        let db = Database::in_memory().await.unwrap();

        db.insert_partial("abc", "notes.pdf", "{}").await.unwrap();
        assert!(db.get_complete("abc").await.unwrap().is_none());
        assert_eq!(db.list_incomplete().await.unwrap(), vec!["abc".to_string()]);

        assert!(db.mark_complete("abc", 12).await.unwrap());
        let row = db.get_complete("abc").await.unwrap().unwrap();
        assert_eq!(row.filename, "notes.pdf");
        assert_eq!(row.length, 12);
        assert_eq!(row.state, BlobState::Complete);
        assert!(db.list_incomplete().await.unwrap().is_empty());

        // A second completion is a no-op
        assert!(!db.mark_complete("abc", 99).await.unwrap());
    }

    #[tokio::test]
    async fn test_deletion_claim_is_exclusive() {
        let db = Database::in_memory().await.unwrap();
        db.insert_partial("abc", "a.png", "{}").await.unwrap();
        db.mark_complete("abc", 3).await.unwrap();

        assert!(db.mark_deleting("abc").await.unwrap());
        assert!(!db.mark_deleting("abc").await.unwrap());
        assert!(db.get_complete("abc").await.unwrap().is_none());
        assert_eq!(
            db.get_any("abc").await.unwrap().unwrap().state,
            BlobState::Deleting
        );

        assert!(db.delete_blob("abc").await.unwrap());
        assert!(!db.delete_blob("abc").await.unwrap());
    }
}
