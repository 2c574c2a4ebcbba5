pub mod models;
mod sqlite;
pub mod types;

use std::collections::HashSet;
use std::ops::Deref;

use sqlx::SqlitePool;

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = sqlite::connect_sqlite(database_url).await?;
            sqlite::migrate_sqlite(&db).await?;
            return Ok(Database::new(db));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    /// Connect to a private in-memory catalog.
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let url = url::Url::parse("sqlite::memory:")
            .map_err(|e| DatabaseSetupError::InvalidUrl(e.to_string()))?;
        Self::connect(&url).await
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.0).await?;
        Ok(())
    }

    /// Number of catalog rows, across every kind, pointing at `file_key`.
    pub async fn file_key_references(&self, file_key: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM reviewers WHERE file_key = ?1)
              + (SELECT COUNT(*) FROM pointers WHERE file_key = ?1)
              + (SELECT COUNT(*) FROM reviewer_requests WHERE file_key = ?1)
            "#,
        )
        .bind(file_key)
        .fetch_one(&self.0)
        .await
    }

    /// Every file key referenced by some catalog row.
    pub async fn referenced_file_keys(&self) -> Result<HashSet<String>, sqlx::Error> {
        let keys = sqlx::query_scalar::<_, String>(
            r#"
            SELECT file_key FROM reviewers
            UNION SELECT file_key FROM pointers
            UNION SELECT file_key FROM reviewer_requests
            "#,
        )
        .fetch_all(&self.0)
        .await?;

        Ok(keys.into_iter().collect())
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),

    #[error("invalid database url: {0}")]
    InvalidUrl(String),
}
